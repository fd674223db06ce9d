//! Simple Moving Average of close.
//!
//! Warmup: first (n-1) bars are invalid; a window holding an undefined close
//! is invalid as well.

use crate::domain::indicator::{
    finite, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Sma(period);
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: indicator_type });
    }

    let closes: Vec<Option<f64>> = bars.iter().map(|b| finite(b.close)).collect();
    let values = bars
        .iter()
        .zip(sma_values(&closes, period))
        .map(|(bar, sma)| match sma {
            Some(v) => IndicatorPoint::defined(bar.date, IndicatorValue::Simple(v)),
            None => IndicatorPoint::undefined(bar.date, IndicatorValue::Simple(0.0)),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}

pub(crate) fn sma_values(input: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    (0..input.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &input[i + 1 - period..=i];
            let sum = window.iter().copied().sum::<Option<f64>>()?;
            Some(sum / period as f64)
        })
        .collect()
}
