//! Price bar and price series representation.
//!
//! A raw value that could not be read as a number is stored as `f64::NAN`
//! and treated as undefined by every indicator.

use crate::domain::error::TallyError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// A bar whose defined prices break `high >= close >= low`. Undefined
    /// values never make a bar malformed.
    pub fn is_malformed(&self) -> bool {
        let defined = |v: f64| v.is_finite();
        if defined(self.high) && defined(self.low) && self.high < self.low {
            return true;
        }
        defined(self.close)
            && ((defined(self.high) && self.close > self.high)
                || (defined(self.low) && self.close < self.low))
    }
}

/// Raw price columns addressed by name at ingestion boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceColumn {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceColumn {
    /// Columns every indicator computation depends on.
    pub const REQUIRED: [PriceColumn; 3] = [PriceColumn::Close, PriceColumn::High, PriceColumn::Low];

    pub fn name(&self) -> &'static str {
        match self {
            PriceColumn::Open => "open",
            PriceColumn::High => "high",
            PriceColumn::Low => "low",
            PriceColumn::Close => "close",
            PriceColumn::Volume => "volume",
        }
    }

    /// Case-insensitive header lookup.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_lowercase().as_str() {
            "open" => Some(PriceColumn::Open),
            "high" => Some(PriceColumn::High),
            "low" => Some(PriceColumn::Low),
            "close" => Some(PriceColumn::Close),
            "volume" => Some(PriceColumn::Volume),
            _ => None,
        }
    }
}

impl fmt::Display for PriceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Time-ordered bars with unique dates. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts by date and keeps the first bar of any duplicated date.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Result<Self, TallyError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(TallyError::NoData { symbol });
        }
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(Self { symbol, bars })
    }

    /// Builds a series from named columns. `close`, `high` and `low` are
    /// required; a missing `open` is undefined and a missing `volume` is zero.
    pub fn from_columns(
        symbol: impl Into<String>,
        dates: Vec<NaiveDate>,
        columns: &HashMap<PriceColumn, Vec<f64>>,
    ) -> Result<Self, TallyError> {
        for column in PriceColumn::REQUIRED {
            if !columns.contains_key(&column) {
                return Err(TallyError::MissingColumn {
                    column: column.name().to_string(),
                });
            }
        }
        for (column, values) in columns {
            if values.len() != dates.len() {
                return Err(TallyError::LengthMismatch {
                    what: format!("column '{}' vs dates", column),
                    left: values.len(),
                    right: dates.len(),
                });
            }
        }

        let value = |column: PriceColumn, i: usize, default: f64| {
            columns.get(&column).map_or(default, |v| v[i])
        };
        let bars = dates
            .iter()
            .enumerate()
            .map(|(i, &date)| PriceBar {
                date,
                open: value(PriceColumn::Open, i, f64::NAN),
                high: value(PriceColumn::High, i, f64::NAN),
                low: value(PriceColumn::Low, i, f64::NAN),
                close: value(PriceColumn::Close, i, f64::NAN),
                volume: value(PriceColumn::Volume, i, 0.0),
            })
            .collect();

        Self::new(symbol, bars)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }
}
