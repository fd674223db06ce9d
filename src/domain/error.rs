//! Domain error types.

/// Top-level error type for tallytrader.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    #[error("missing required price column '{column}'")]
    MissingColumn { column: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no combinator strategies enabled")]
    NoStrategiesEnabled,

    #[error("length mismatch: {what} ({left} vs {right})")]
    LengthMismatch {
        what: String,
        left: usize,
        right: usize,
    },

    #[error("invalid price {price} at step {index}")]
    InvalidPrice { index: usize, price: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TallyError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TallyError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TallyError> for std::process::ExitCode {
    fn from(err: &TallyError) -> Self {
        let code: u8 = match err {
            TallyError::Io(_) => 1,
            TallyError::ConfigParse { .. }
            | TallyError::ConfigMissing { .. }
            | TallyError::ConfigInvalid { .. }
            | TallyError::NoStrategiesEnabled => 2,
            TallyError::MissingColumn { .. } | TallyError::Data { .. } => 3,
            TallyError::NoData { .. } => 5,
            TallyError::LengthMismatch { .. } | TallyError::InvalidPrice { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
