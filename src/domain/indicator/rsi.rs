//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).
//! A change touching an undefined close is skipped and leaves the averages as they were.

use crate::domain::indicator::{
    IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Rsi(period);
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: indicator_type });
    }

    let n = period as f64;
    let mut values = Vec::with_capacity(bars.len());
    let mut seed_gain = 0.0;
    let mut seed_loss = 0.0;
    let mut seen = 0usize;
    let mut averages: Option<(f64, f64)> = None;

    for (i, bar) in bars.iter().enumerate() {
        let change = if i == 0 {
            f64::NAN
        } else {
            bar.close - bars[i - 1].close
        };
        if !change.is_finite() {
            values.push(IndicatorPoint::undefined(bar.date, IndicatorValue::Simple(0.0)));
            continue;
        }

        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        averages = match averages {
            None => {
                seed_gain += gain;
                seed_loss += loss;
                seen += 1;
                (seen == period).then(|| (seed_gain / n, seed_loss / n))
            }
            Some((avg_gain, avg_loss)) => Some((
                (avg_gain * (n - 1.0) + gain) / n,
                (avg_loss * (n - 1.0) + loss) / n,
            )),
        };

        match averages {
            Some((avg_gain, avg_loss)) => values.push(IndicatorPoint::defined(
                bar.date,
                IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
            )),
            None => values.push(IndicatorPoint::undefined(bar.date, IndicatorValue::Simple(0.0))),
        }
    }

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
