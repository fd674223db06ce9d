//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9.
//! Both EMAs and the signal EMA are seeded by their first defined input, so a
//! point is valid wherever the close is defined.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{
    finite, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if fast == 0 || slow == 0 || signal_period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: indicator_type });
    }

    let closes: Vec<Option<f64>> = bars.iter().map(|b| finite(b.close)).collect();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let macd_line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_values(&macd_line, signal_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match (macd_line[i], signal_line[i]) {
            (Some(line), Some(signal)) => IndicatorPoint::defined(
                bar.date,
                IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            ),
            _ => IndicatorPoint::undefined(
                bar.date,
                IndicatorValue::Macd {
                    line: 0.0,
                    signal: 0.0,
                    histogram: 0.0,
                },
            ),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
