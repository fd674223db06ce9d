//! ADX (Average Directional Index), Wilder.
//!
//! 1. TR, +DM and -DM from consecutive bars
//! 2. Wilder-smooth TR, +DM and -DM
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise (0 on zero TR)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI) (0 when both are 0)
//! 5. ADX = Wilder-smoothed DX
//!
//! Default period: 14. Warmup: first (2n - 1) bars are invalid.

use crate::domain::indicator::{
    IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::indicator_helpers::wilder_smooth;
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_adx(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Adx(period);
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: indicator_type });
    }

    let len = bars.len();
    let mut tr = vec![None; len];
    let mut plus_dm = vec![None; len];
    let mut minus_dm = vec![None; len];

    for i in 1..len {
        let (curr, prev) = (&bars[i], &bars[i - 1]);
        let inputs = [curr.high, curr.low, prev.high, prev.low, prev.close];
        if inputs.iter().any(|v| !v.is_finite()) {
            continue;
        }

        let up_move = curr.high - prev.high;
        let down_move = prev.low - curr.low;

        plus_dm[i] = Some(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm[i] = Some(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        tr[i] = Some(curr.true_range(prev.close));
    }

    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus = wilder_smooth(&plus_dm, period);
    let smooth_minus = wilder_smooth(&minus_dm, period);

    let dx: Vec<Option<f64>> = (0..len)
        .map(|i| {
            let (tr, plus, minus) = (smooth_tr[i]?, smooth_plus[i]?, smooth_minus[i]?);
            let (plus_di, minus_di) = if tr == 0.0 {
                (0.0, 0.0)
            } else {
                (100.0 * plus / tr, 100.0 * minus / tr)
            };
            let di_sum = plus_di + minus_di;
            Some(if di_sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / di_sum
            })
        })
        .collect();
    let adx = wilder_smooth(&dx, period);

    let values = bars
        .iter()
        .zip(adx)
        .map(|(bar, adx)| match adx {
            Some(v) => IndicatorPoint::defined(bar.date, IndicatorValue::Simple(v)),
            None => IndicatorPoint::undefined(bar.date, IndicatorValue::Simple(0.0)),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
