//! Configuration loading and validation.
//!
//! Every section is read through `ConfigPort`, defaulted where a key is absent
//! and validated before anything runs. Out-of-range values fail with
//! `ConfigInvalid` naming the section and key.

use crate::domain::backtest::BacktestConfig;
use crate::domain::combinator::CombinatorConfig;
use crate::domain::error::TallyError;
use crate::domain::frame::IndicatorParams;
use crate::domain::voting::{VoteConfig, VoteThresholds};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Where price (and optionally prediction) data comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub dir: PathBuf,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub predictions: Option<PathBuf>,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data: DataSettings,
    pub indicators: IndicatorParams,
    pub voting: VoteConfig,
    pub combinator: CombinatorConfig,
    pub backtest: BacktestConfig,
}

pub fn load_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, TallyError> {
    Ok(RunSettings {
        data: load_data_settings(config)?,
        indicators: load_indicator_params(config)?,
        voting: load_vote_config(config)?,
        combinator: load_combinator_config(config)?,
        backtest: load_backtest_config(config)?,
    })
}

pub fn load_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, TallyError> {
    let symbol = config
        .get_string("data", "symbol")
        .ok_or_else(|| TallyError::ConfigMissing {
            section: "data".to_string(),
            key: "symbol".to_string(),
        })?;
    let dir = config
        .get_string("data", "dir")
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(TallyError::invalid(
                "data",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }

    Ok(DataSettings {
        dir,
        symbol: symbol.trim().to_string(),
        start_date,
        end_date,
        predictions: config.get_string("data", "predictions").map(PathBuf::from),
    })
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, TallyError> {
    match config.get_string("data", key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                TallyError::invalid(
                    "data",
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

pub fn load_indicator_params(config: &dyn ConfigPort) -> Result<IndicatorParams, TallyError> {
    let defaults = IndicatorParams::default();
    let section = "indicators";

    let bb_stddev = config
        .get_double(section, "bb_stddev")?
        .unwrap_or(defaults.bb_stddev_mult_x100 as f64 / 100.0);
    if bb_stddev <= 0.0 || bb_stddev > 10.0 {
        return Err(TallyError::invalid(
            section,
            "bb_stddev",
            "bb_stddev must be within (0, 10]",
        ));
    }

    let params = IndicatorParams {
        macd_fast: window(config, section, "macd_fast", defaults.macd_fast)?,
        macd_slow: window(config, section, "macd_slow", defaults.macd_slow)?,
        macd_signal: window(config, section, "macd_signal", defaults.macd_signal)?,
        bb_period: window(config, section, "bb_period", defaults.bb_period)?,
        bb_stddev_mult_x100: (bb_stddev * 100.0).round() as u32,
        stoch_period: window(config, section, "stoch_period", defaults.stoch_period)?,
        stoch_smoothing: window(config, section, "stoch_smoothing", defaults.stoch_smoothing)?,
        rsi_period: window(config, section, "rsi_period", defaults.rsi_period)?,
        adx_period: window(config, section, "adx_period", defaults.adx_period)?,
    };

    if params.macd_fast >= params.macd_slow {
        return Err(TallyError::invalid(
            section,
            "macd_fast",
            "macd_fast must be below macd_slow",
        ));
    }
    Ok(params)
}

pub fn load_vote_config(config: &dyn ConfigPort) -> Result<VoteConfig, TallyError> {
    let defaults = VoteConfig::default();
    let section = "voting";

    let vote = VoteConfig {
        use_macd: flag(config, section, "use_macd", defaults.use_macd)?,
        use_bb: flag(config, section, "use_bb", defaults.use_bb)?,
        use_stoch: flag(config, section, "use_stoch", defaults.use_stoch)?,
        use_rsi: flag(config, section, "use_rsi", defaults.use_rsi)?,
        use_adx: flag(config, section, "use_adx", defaults.use_adx)?,
        thresholds: VoteThresholds {
            stoch_oversold: number(
                config,
                section,
                "stoch_oversold",
                defaults.thresholds.stoch_oversold,
            )?,
            rsi_oversold: number(config, section, "rsi_oversold", defaults.thresholds.rsi_oversold)?,
            adx_trending: number(config, section, "adx_trending", defaults.thresholds.adx_trending)?,
        },
    };
    vote.validate()?;
    Ok(vote)
}

pub fn load_combinator_config(config: &dyn ConfigPort) -> Result<CombinatorConfig, TallyError> {
    let defaults = CombinatorConfig::default();
    let section = "combinator";

    let combinator = CombinatorConfig {
        use_prediction: flag(config, section, "use_prediction", defaults.use_prediction)?,
        use_rsi: flag(config, section, "use_rsi", defaults.use_rsi)?,
        use_ma: flag(config, section, "use_ma", defaults.use_ma)?,
        prediction_threshold: number(
            config,
            section,
            "prediction_threshold",
            defaults.prediction_threshold,
        )?,
        rsi_low: number(config, section, "rsi_low", defaults.rsi_low)?,
        rsi_high: number(config, section, "rsi_high", defaults.rsi_high)?,
        short_window: window(config, section, "short_window", defaults.short_window)?,
        long_window: window(config, section, "long_window", defaults.long_window)?,
    };
    combinator.validate()?;
    Ok(combinator)
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TallyError> {
    let defaults = BacktestConfig::default();
    let backtest = BacktestConfig {
        starting_capital: number(config, "backtest", "starting_capital", defaults.starting_capital)?,
    };
    backtest.validate()?;
    Ok(backtest)
}

fn window(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TallyError> {
    match config.get_int(section, key)? {
        None => Ok(default),
        Some(v) if v >= 1 => usize::try_from(v)
            .map_err(|_| TallyError::invalid(section, key, format!("{} is too large", v))),
        Some(v) => Err(TallyError::invalid(
            section,
            key,
            format!("{} must be at least 1", v),
        )),
    }
}

fn flag(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, TallyError> {
    Ok(config.get_bool(section, key)?.unwrap_or(default))
}

fn number(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, TallyError> {
    Ok(config.get_double(section, key)?.unwrap_or(default))
}
