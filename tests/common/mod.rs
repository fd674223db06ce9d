#![allow(dead_code)]

use chrono::NaiveDate;
pub use tallytrader::domain::ohlcv::{PriceBar, PriceSeries};
use tallytrader::domain::error::TallyError;
use tallytrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, TallyError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TallyError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<PriceBar> = self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s) && end_date.is_none_or(|e| b.date <= e))
            .collect();
        PriceSeries::new(symbol, bars)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> PriceBar {
    PriceBar {
        date: date(date_str),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1000.0,
    }
}

/// Consecutive daily bars from 2024-01-01 with the given closes.
pub fn daily_bars(closes: &[f64]) -> Vec<PriceBar> {
    let start = date("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// A long slide followed by a sharp rebound: oversold readings then a
/// MACD crossover.
pub fn dip_and_recovery(len: usize) -> Vec<f64> {
    let turn = len * 2 / 3;
    (0..len)
        .map(|i| {
            if i < turn {
                200.0 - 1.5 * i as f64
            } else {
                200.0 - 1.5 * turn as f64 + 4.0 * (i - turn) as f64
            }
        })
        .collect()
}
