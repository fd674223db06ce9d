//! Signal combinators: prediction, RSI band and MA-crossover strategies
//! merged by a stable plurality vote.
//!
//! Each strategy maps one step to `Buy`/`Sell`/`Hold`, with `Hold` wherever an
//! input is undefined. The combined label at a step is the most frequent one
//! across enabled strategies; a tie goes to the label seen first in strategy
//! order (prediction, RSI, MA).

use crate::domain::error::TallyError;
use crate::domain::indicator::{calculate_rsi, calculate_sma};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::voting::Signal;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

fn check_lengths(what: &str, left: usize, right: usize) -> Result<(), TallyError> {
    if left != right {
        return Err(TallyError::LengthMismatch {
            what: what.to_string(),
            left,
            right,
        });
    }
    Ok(())
}

/// `Buy` when the prediction clears `actual * (1 + threshold)`, `Sell` when it
/// falls below `actual * (1 - threshold)`.
pub fn prediction_signal(
    actual: &[Option<f64>],
    predicted: &[Option<f64>],
    threshold: f64,
) -> Result<Vec<Signal>, TallyError> {
    check_lengths("actual vs predicted", actual.len(), predicted.len())?;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|pair| match pair {
            (Some(a), Some(p)) if *p > a * (1.0 + threshold) => Signal::Buy,
            (Some(a), Some(p)) if *p < a * (1.0 - threshold) => Signal::Sell,
            _ => Signal::Hold,
        })
        .collect())
}

pub fn rsi_signal(rsi: &[Option<f64>], low: f64, high: f64) -> Vec<Signal> {
    rsi.iter()
        .map(|r| match *r {
            Some(r) if r < low => Signal::Buy,
            Some(r) if r > high => Signal::Sell,
            _ => Signal::Hold,
        })
        .collect()
}

pub fn ma_signal(short_ma: &[Option<f64>], long_ma: &[Option<f64>]) -> Result<Vec<Signal>, TallyError> {
    check_lengths("short MA vs long MA", short_ma.len(), long_ma.len())?;
    Ok(short_ma
        .iter()
        .zip(long_ma)
        .map(|pair| match pair {
            (Some(s), Some(l)) if s > l => Signal::Buy,
            (Some(s), Some(l)) if s < l => Signal::Sell,
            _ => Signal::Hold,
        })
        .collect())
}

/// Stable plurality across equally long strategy layers.
pub fn combine(layers: &[Vec<Signal>]) -> Result<Vec<Signal>, TallyError> {
    let first = layers.first().ok_or(TallyError::NoStrategiesEnabled)?;
    for layer in &layers[1..] {
        check_lengths("strategy layers", first.len(), layer.len())?;
    }

    Ok((0..first.len())
        .map(|t| {
            let mut counts: Vec<(Signal, usize)> = Vec::with_capacity(3);
            for layer in layers {
                match counts.iter_mut().find(|(s, _)| *s == layer[t]) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((layer[t], 1)),
                }
            }
            // strict comparison keeps the earliest label on a tie
            let mut best = counts[0];
            for &candidate in &counts[1..] {
                if candidate.1 > best.1 {
                    best = candidate;
                }
            }
            best.0
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinatorConfig {
    pub use_prediction: bool,
    pub use_rsi: bool,
    pub use_ma: bool,
    pub prediction_threshold: f64,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for CombinatorConfig {
    fn default() -> Self {
        Self {
            use_prediction: true,
            use_rsi: true,
            use_ma: true,
            prediction_threshold: 0.02,
            rsi_low: 30.0,
            rsi_high: 70.0,
            short_window: 20,
            long_window: 50,
        }
    }
}

impl CombinatorConfig {
    pub fn validate(&self) -> Result<(), TallyError> {
        if !(self.use_prediction || self.use_rsi || self.use_ma) {
            return Err(TallyError::NoStrategiesEnabled);
        }
        if !(self.prediction_threshold > 0.0 && self.prediction_threshold < 1.0) {
            return Err(TallyError::invalid(
                "combinator",
                "prediction_threshold",
                "must be within (0, 1)",
            ));
        }
        for (key, value) in [("rsi_low", self.rsi_low), ("rsi_high", self.rsi_high)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(TallyError::invalid("combinator", key, "must be within [0, 100]"));
            }
        }
        if self.rsi_low >= self.rsi_high {
            return Err(TallyError::invalid(
                "combinator",
                "rsi_low",
                "must be below rsi_high",
            ));
        }
        for (key, value) in [
            ("short_window", self.short_window),
            ("long_window", self.long_window),
        ] {
            if value < 1 {
                return Err(TallyError::invalid("combinator", key, "must be at least 1"));
            }
        }
        Ok(())
    }
}

/// Per-step inputs of the combinator strategies, aligned to one price series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CombinatorInputs {
    pub actual: Vec<Option<f64>>,
    /// Absent when no prediction source is supplied.
    pub predicted: Option<Vec<Option<f64>>>,
    pub rsi: Vec<Option<f64>>,
    pub short_ma: Vec<Option<f64>>,
    pub long_ma: Vec<Option<f64>>,
}

impl CombinatorInputs {
    /// Derives RSI and both moving averages from the series closes.
    pub fn from_series(
        series: &PriceSeries,
        config: &CombinatorConfig,
        rsi_period: usize,
        predicted: Option<Vec<Option<f64>>>,
    ) -> Result<Self, TallyError> {
        let bars = series.bars();
        let rsi = calculate_rsi(bars, rsi_period)
            .map_err(|e| TallyError::invalid("indicators", "rsi_period", e.to_string()))?;
        let short_ma = calculate_sma(bars, config.short_window)
            .map_err(|e| TallyError::invalid("combinator", "short_window", e.to_string()))?;
        let long_ma = calculate_sma(bars, config.long_window)
            .map_err(|e| TallyError::invalid("combinator", "long_window", e.to_string()))?;

        Ok(Self {
            actual: bars
                .iter()
                .map(|b| b.close.is_finite().then_some(b.close))
                .collect(),
            predicted,
            rsi: rsi.simple_values(),
            short_ma: short_ma.simple_values(),
            long_ma: long_ma.simple_values(),
        })
    }
}

/// Aligns an external prediction series to the price series by date.
pub fn align_predictions(series: &PriceSeries, predictions: &[(NaiveDate, f64)]) -> Vec<Option<f64>> {
    let by_date: HashMap<NaiveDate, f64> = predictions.iter().copied().collect();
    let aligned: Vec<Option<f64>> = series
        .bars()
        .iter()
        .map(|b| by_date.get(&b.date).copied().filter(|p| p.is_finite()))
        .collect();
    debug!(
        rows = aligned.len(),
        matched = aligned.iter().filter(|p| p.is_some()).count(),
        "predictions aligned"
    );
    aligned
}

pub fn combine_strategies(
    config: &CombinatorConfig,
    inputs: &CombinatorInputs,
) -> Result<Vec<Signal>, TallyError> {
    config.validate()?;

    let mut layers = Vec::with_capacity(3);
    if config.use_prediction {
        let predicted = inputs.predicted.as_ref().ok_or_else(|| TallyError::ConfigMissing {
            section: "data".to_string(),
            key: "predictions".to_string(),
        })?;
        layers.push(prediction_signal(
            &inputs.actual,
            predicted,
            config.prediction_threshold,
        )?);
    }
    if config.use_rsi {
        check_lengths("actual vs RSI", inputs.actual.len(), inputs.rsi.len())?;
        layers.push(rsi_signal(&inputs.rsi, config.rsi_low, config.rsi_high));
    }
    if config.use_ma {
        check_lengths("actual vs short MA", inputs.actual.len(), inputs.short_ma.len())?;
        layers.push(ma_signal(&inputs.short_ma, &inputs.long_ma)?);
    }

    debug!(strategies = layers.len(), "combining strategy signals");
    combine(&layers)
}
