//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid, as is any window holding an
//! undefined close.

use crate::domain::indicator::{
    IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_STDDEV_MULT_X100: u32 = 200;

pub fn calculate_bollinger(
    bars: &[PriceBar],
    period: usize,
    stddev_mult_x100: u32,
) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: indicator_type });
    }

    let mult = stddev_mult_x100 as f64 / 100.0;
    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let date = bars[i].date;
        let window = (i + 1 >= period).then(|| &bars[i + 1 - period..=i]);

        match window.filter(|w| w.iter().all(|b| b.close.is_finite())) {
            Some(window) => {
                let middle: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
                let variance: f64 = window
                    .iter()
                    .map(|b| {
                        let diff = b.close - middle;
                        diff * diff
                    })
                    .sum::<f64>()
                    / period as f64;
                let stddev = variance.sqrt();

                values.push(IndicatorPoint::defined(
                    date,
                    IndicatorValue::Bollinger {
                        upper: middle + mult * stddev,
                        middle,
                        lower: middle - mult * stddev,
                    },
                ));
            }
            None => values.push(IndicatorPoint::undefined(
                date,
                IndicatorValue::Bollinger {
                    upper: 0.0,
                    middle: 0.0,
                    lower: 0.0,
                },
            )),
        }
    }

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
