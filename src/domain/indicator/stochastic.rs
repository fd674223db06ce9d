//! Stochastic Oscillator (%K / %D).
//!
//! %K = 100 * (C - lowest_low(n)) / (highest_high(n) - lowest_low(n))
//! %D = SMA(d) of %K
//!
//! A flat window (highest high == lowest low) reads 50, the neutral midpoint.
//! Default parameters: k_period=14, d_period=3.
//! Warmup: %K from bar k_period-1, %D from bar k_period+d_period-2.

use crate::domain::indicator::sma::sma_values;
use crate::domain::indicator::{
    IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::indicator_helpers::{rolling_max, rolling_min};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

const FLAT_RANGE_K: f64 = 50.0;

pub fn calculate_stochastic(
    bars: &[PriceBar],
    k_period: usize,
    d_period: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: indicator_type });
    }

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let highest = rolling_max(&highs, k_period);
    let lowest = rolling_min(&lows, k_period);

    let k_line: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (high, low) = (highest[i]?, lowest[i]?);
            if !bar.close.is_finite() {
                return None;
            }
            let range = high - low;
            if range == 0.0 {
                Some(FLAT_RANGE_K)
            } else {
                Some(100.0 * ((bar.close - low) / range))
            }
        })
        .collect();
    let d_line = sma_values(&k_line, d_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match k_line[i] {
            Some(k) => IndicatorPoint::defined(
                bar.date,
                IndicatorValue::Stochastic { k, d: d_line[i] },
            ),
            None => IndicatorPoint::undefined(
                bar.date,
                IndicatorValue::Stochastic { k: 0.0, d: None },
            ),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
