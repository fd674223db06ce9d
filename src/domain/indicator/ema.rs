//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first defined close, then
//! EMA[i] = EMA[i-1] + k*(C[i] - EMA[i-1]).
//! Defined from the seed onward; an undefined close yields an undefined point
//! and the recursion resumes from the last defined EMA.

use crate::domain::indicator::{
    finite, IndicatorError, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, IndicatorError> {
    let indicator_type = IndicatorType::Ema(period);
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: indicator_type });
    }

    let closes: Vec<Option<f64>> = bars.iter().map(|b| finite(b.close)).collect();
    let values = bars
        .iter()
        .zip(ema_values(&closes, period))
        .map(|(bar, ema)| match ema {
            Some(v) => IndicatorPoint::defined(bar.date, IndicatorValue::Simple(v)),
            None => IndicatorPoint::undefined(bar.date, IndicatorValue::Simple(0.0)),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}

/// Recursive EMA over a sparse input. The update is written as
/// `prev + k*(x - prev)` so a constant input reproduces itself exactly.
pub(crate) fn ema_values(input: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema: Option<f64> = None;

    input
        .iter()
        .map(|&value| {
            let x = value?;
            let next = match ema {
                None => x,
                Some(prev) => prev + k * (x - prev),
            };
            ema = Some(next);
            ema
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::make_bars;

    fn simple(series: &IndicatorSeries, i: usize) -> f64 {
        match series.values[i].value {
            IndicatorValue::Simple(v) => v,
            _ => panic!("Expected Simple value"),
        }
    }

    #[test]
    fn ema_seeded_by_first_close() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 3).unwrap();

        assert!(series.values[0].valid);
        assert!((simple(&series, 0) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 3).unwrap();

        let k = 2.0 / 4.0;
        let ema_1 = 20.0 * k + 10.0 * (1.0 - k);
        let ema_2 = 30.0 * k + ema_1 * (1.0 - k);
        assert!((simple(&series, 1) - ema_1).abs() < 1e-12);
        assert!((simple(&series, 2) - ema_2).abs() < 1e-12);
    }

    #[test]
    fn ema_constant_series_is_constant_from_first_bar() {
        let bars = make_bars(&[100.0; 40]);
        let series = calculate_ema(&bars, 12).unwrap();

        for i in 0..40 {
            assert!(series.values[i].valid);
            assert_eq!(simple(&series, i), 100.0);
        }
    }

    #[test]
    fn ema_period_1_tracks_close() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 1).unwrap();
        assert!((simple(&series, 2) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_undefined_close_resumes_from_last_value() {
        let bars = make_bars(&[f64::NAN, 10.0, f64::NAN, 20.0]);
        let series = calculate_ema(&bars, 3).unwrap();

        assert!(!series.values[0].valid);
        assert!(series.values[1].valid);
        assert!(!series.values[2].valid);
        assert!(series.values[3].valid);

        let expected = 10.0 + 0.5 * (20.0 - 10.0);
        assert!((simple(&series, 3) - expected).abs() < 1e-12);
    }

    #[test]
    fn ema_empty_bars() {
        let series = calculate_ema(&[], 3).unwrap();
        assert!(series.values.is_empty());
    }

    #[test]
    fn ema_period_0_is_an_error() {
        let bars = make_bars(&[10.0, 20.0]);
        let err = calculate_ema(&bars, 0).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InvalidPeriod {
                indicator: IndicatorType::Ema(0)
            }
        );
    }
}
