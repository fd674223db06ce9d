//! Indicator frame: the price series aligned with its indicator columns.
//!
//! Every indicator is computed in isolation. A failing unit leaves its columns
//! undefined and is flagged `Unavailable`; the others are unaffected. Every
//! input row is present in the frame, warm-up rows simply read `None`.

use crate::domain::error::TallyError;
use crate::domain::indicator::{
    IndicatorError, IndicatorSeries, IndicatorType, IndicatorValue, bollinger, calculate_adx,
    calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi, calculate_stochastic,
    macd, rsi, stochastic,
};
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Named indicator columns of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameColumn {
    Ema12,
    Ema26,
    Macd,
    MacdSignal,
    MacdHist,
    BbHigh,
    BbMid,
    BbLow,
    StochK,
    StochD,
    Rsi,
    Adx,
}

impl FrameColumn {
    pub const ALL: [FrameColumn; 12] = [
        FrameColumn::Ema12,
        FrameColumn::Ema26,
        FrameColumn::Macd,
        FrameColumn::MacdSignal,
        FrameColumn::MacdHist,
        FrameColumn::BbHigh,
        FrameColumn::BbMid,
        FrameColumn::BbLow,
        FrameColumn::StochK,
        FrameColumn::StochD,
        FrameColumn::Rsi,
        FrameColumn::Adx,
    ];

    /// Display label. Labels are stable regardless of the configured windows.
    pub fn label(&self) -> &'static str {
        match self {
            FrameColumn::Ema12 => "EMA12",
            FrameColumn::Ema26 => "EMA26",
            FrameColumn::Macd => "MACD",
            FrameColumn::MacdSignal => "MACD_Signal",
            FrameColumn::MacdHist => "MACD_Hist",
            FrameColumn::BbHigh => "BB_High",
            FrameColumn::BbMid => "BB_Mid",
            FrameColumn::BbLow => "BB_Low",
            FrameColumn::StochK => "%K",
            FrameColumn::StochD => "%D",
            FrameColumn::Rsi => "RSI",
            FrameColumn::Adx => "ADX",
        }
    }
}

impl fmt::Display for FrameColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Indicator windows used to build a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_stddev_mult_x100: u32,
    pub stoch_period: usize,
    pub stoch_smoothing: usize,
    pub rsi_period: usize,
    pub adx_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            bb_period: bollinger::DEFAULT_PERIOD,
            bb_stddev_mult_x100: bollinger::DEFAULT_STDDEV_MULT_X100,
            stoch_period: stochastic::DEFAULT_K_PERIOD,
            stoch_smoothing: stochastic::DEFAULT_D_PERIOD,
            rsi_period: rsi::DEFAULT_PERIOD,
            adx_period: crate::domain::indicator::adx::DEFAULT_PERIOD,
        }
    }
}

/// Per-indicator outcome of a frame computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    Available,
    /// Fewer bars than the indicator needs to be fully defined.
    InsufficientHistory { bars: usize, required: usize },
    /// Computed, but the listed rows produced non-finite values and were masked.
    Degraded { rows: Vec<usize> },
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::InsufficientHistory { bars, required } => {
                write!(f, "insufficient history ({} of {} bars)", bars, required)
            }
            Availability::Degraded { rows } => write!(f, "degraded ({} rows masked)", rows.len()),
            Availability::Unavailable { reason } => write!(f, "unavailable: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    series: PriceSeries,
    columns: BTreeMap<FrameColumn, Vec<Option<f64>>>,
    availability: Vec<(IndicatorType, Availability)>,
}

impl IndicatorFrame {
    /// Builds a frame from precomputed columns. Columns not supplied are
    /// entirely undefined.
    pub fn with_columns(
        series: PriceSeries,
        supplied: impl IntoIterator<Item = (FrameColumn, Vec<Option<f64>>)>,
    ) -> Result<Self, TallyError> {
        let len = series.len();
        let mut columns: BTreeMap<FrameColumn, Vec<Option<f64>>> = FrameColumn::ALL
            .iter()
            .map(|&c| (c, vec![None; len]))
            .collect();
        for (column, values) in supplied {
            if values.len() != len {
                return Err(TallyError::LengthMismatch {
                    what: format!("column {} vs price rows", column),
                    left: values.len(),
                    right: len,
                });
            }
            columns.insert(column, values);
        }
        Ok(Self {
            series,
            columns,
            availability: Vec::new(),
        })
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.series.bars().get(index).map(|b| b.date)
    }

    /// Close at `index`, `None` when out of range or undefined.
    pub fn close(&self, index: usize) -> Option<f64> {
        self.series
            .bars()
            .get(index)
            .map(|b| b.close)
            .filter(|c| c.is_finite())
    }

    pub fn value(&self, column: FrameColumn, index: usize) -> Option<f64> {
        self.columns.get(&column)?.get(index).copied().flatten()
    }

    pub fn column(&self, column: FrameColumn) -> &[Option<f64>] {
        self.columns.get(&column).map_or(&[], |v| v.as_slice())
    }

    pub fn availability(&self) -> &[(IndicatorType, Availability)] {
        &self.availability
    }
}

/// Computes every frame indicator with default windows.
pub fn add_indicators(series: &PriceSeries) -> IndicatorFrame {
    add_indicators_with(series, &IndicatorParams::default())
}

pub fn add_indicators_with(series: &PriceSeries, params: &IndicatorParams) -> IndicatorFrame {
    let bars = series.bars();
    let mut columns = BTreeMap::new();
    let mut availability = Vec::new();

    let units: [(Result<IndicatorSeries, IndicatorError>, IndicatorType, &[FrameColumn]); 7] = [
        (
            calculate_ema(bars, params.macd_fast),
            IndicatorType::Ema(params.macd_fast),
            &[FrameColumn::Ema12],
        ),
        (
            calculate_ema(bars, params.macd_slow),
            IndicatorType::Ema(params.macd_slow),
            &[FrameColumn::Ema26],
        ),
        (
            calculate_macd(bars, params.macd_fast, params.macd_slow, params.macd_signal),
            IndicatorType::Macd {
                fast: params.macd_fast,
                slow: params.macd_slow,
                signal: params.macd_signal,
            },
            &[FrameColumn::Macd, FrameColumn::MacdSignal, FrameColumn::MacdHist],
        ),
        (
            calculate_bollinger(bars, params.bb_period, params.bb_stddev_mult_x100),
            IndicatorType::Bollinger {
                period: params.bb_period,
                stddev_mult_x100: params.bb_stddev_mult_x100,
            },
            &[FrameColumn::BbHigh, FrameColumn::BbMid, FrameColumn::BbLow],
        ),
        (
            calculate_stochastic(bars, params.stoch_period, params.stoch_smoothing),
            IndicatorType::Stochastic {
                k_period: params.stoch_period,
                d_period: params.stoch_smoothing,
            },
            &[FrameColumn::StochK, FrameColumn::StochD],
        ),
        (
            calculate_rsi(bars, params.rsi_period),
            IndicatorType::Rsi(params.rsi_period),
            &[FrameColumn::Rsi],
        ),
        (
            calculate_adx(bars, params.adx_period),
            IndicatorType::Adx(params.adx_period),
            &[FrameColumn::Adx],
        ),
    ];

    for (result, indicator, outputs) in units {
        let (values, status) = isolate(bars, &indicator, result, outputs.len());
        match &status {
            Availability::Available => {}
            Availability::InsufficientHistory { .. } => {
                debug!(%indicator, %status, "indicator warm-up exceeds series")
            }
            Availability::Degraded { .. } | Availability::Unavailable { .. } => {
                warn!(%indicator, %status, "indicator not fully available")
            }
        }
        for (column, values) in outputs.iter().zip(values) {
            columns.insert(*column, values);
        }
        availability.push((indicator, status));
    }

    debug!(
        symbol = series.symbol(),
        rows = series.len(),
        "indicator frame built"
    );

    IndicatorFrame {
        series: series.clone(),
        columns,
        availability,
    }
}

/// Unpacks one indicator unit into `width` columns, masking failures and
/// non-finite rows to `None`.
fn isolate(
    bars: &[PriceBar],
    indicator: &IndicatorType,
    result: Result<IndicatorSeries, IndicatorError>,
    width: usize,
) -> (Vec<Vec<Option<f64>>>, Availability) {
    let mut columns = vec![vec![None; bars.len()]; width];

    let series = match result {
        Ok(series) => series,
        Err(e) => {
            return (
                columns,
                Availability::Unavailable {
                    reason: e.to_string(),
                },
            );
        }
    };

    let mut degraded = Vec::new();
    for (i, point) in series.values.iter().enumerate().take(bars.len()) {
        if !point.valid {
            continue;
        }
        let outputs = outputs_of(&point.value);
        if outputs.iter().flatten().any(|v| !v.is_finite()) {
            degraded.push(i);
            continue;
        }
        for (column, value) in columns.iter_mut().zip(outputs) {
            column[i] = value;
        }
    }

    let status = if !degraded.is_empty() {
        Availability::Degraded { rows: degraded }
    } else if bars.len() < indicator.required_bars() {
        Availability::InsufficientHistory {
            bars: bars.len(),
            required: indicator.required_bars(),
        }
    } else {
        Availability::Available
    };
    (columns, status)
}

fn outputs_of(value: &IndicatorValue) -> Vec<Option<f64>> {
    match *value {
        IndicatorValue::Simple(v) => vec![Some(v)],
        IndicatorValue::Macd {
            line,
            signal,
            histogram,
        } => vec![Some(line), Some(signal), Some(histogram)],
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } => vec![Some(upper), Some(middle), Some(lower)],
        IndicatorValue::Stochastic { k, d } => vec![Some(k), d],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::make_bars;
    use approx::assert_relative_eq;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new("TEST", make_bars(closes)).unwrap()
    }

    fn status_of(frame: &IndicatorFrame, indicator: &IndicatorType) -> Availability {
        frame
            .availability()
            .iter()
            .find(|(t, _)| t == indicator)
            .map(|(_, a)| a.clone())
            .unwrap()
    }

    #[test]
    fn every_row_present_on_short_series() {
        let frame = add_indicators(&series(&[100.0, 101.0, 102.0, 103.0, 104.0]));

        assert_eq!(frame.len(), 5);
        for column in [
            FrameColumn::BbHigh,
            FrameColumn::BbLow,
            FrameColumn::Rsi,
            FrameColumn::Adx,
            FrameColumn::StochD,
        ] {
            assert_eq!(frame.column(column).len(), 5);
            assert!(frame.column(column).iter().all(Option::is_none), "{}", column);
        }
        assert_eq!(
            status_of(&frame, &IndicatorType::Adx(14)),
            Availability::InsufficientHistory {
                bars: 5,
                required: 28
            }
        );
    }

    #[test]
    fn ema_defined_from_first_row() {
        let frame = add_indicators(&series(&[42.0; 30]));

        for i in 0..30 {
            assert_eq!(frame.value(FrameColumn::Ema12, i), Some(42.0));
            assert_eq!(frame.value(FrameColumn::Ema26, i), Some(42.0));
            assert_eq!(frame.value(FrameColumn::Macd, i), Some(0.0));
        }
    }

    #[test]
    fn long_series_all_available() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let frame = add_indicators(&series(&closes));

        assert_eq!(frame.availability().len(), 7);
        assert!(frame.availability().iter().all(|(_, a)| a.is_available()));
        assert!(frame.value(FrameColumn::Adx, 59).is_some());
        assert!(frame.value(FrameColumn::Adx, 26).is_none());
        assert!(frame.value(FrameColumn::Adx, 27).is_some());
    }

    #[test]
    fn zero_window_isolated_to_its_indicator() {
        let params = IndicatorParams {
            rsi_period: 0,
            ..IndicatorParams::default()
        };
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let frame = add_indicators_with(&series(&closes), &params);

        assert!(matches!(
            status_of(&frame, &IndicatorType::Rsi(0)),
            Availability::Unavailable { .. }
        ));
        assert!(frame.column(FrameColumn::Rsi).iter().all(Option::is_none));
        assert!(frame.value(FrameColumn::BbLow, 39).is_some());
    }

    #[test]
    fn non_finite_output_is_masked_and_flagged() {
        // the squared deviation overflows to infinity
        let mut closes = vec![1.0; 25];
        closes[22] = 1e300;
        let frame = add_indicators(&series(&closes));

        let bb = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        };
        match status_of(&frame, &bb) {
            Availability::Degraded { rows } => assert_eq!(rows, vec![22, 23, 24]),
            other => panic!("expected degraded, got {:?}", other),
        }
        assert_eq!(frame.value(FrameColumn::BbHigh, 22), None);
        assert!(frame.value(FrameColumn::BbHigh, 21).is_some());
    }

    #[test]
    fn values_do_not_depend_on_later_rows() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let full = add_indicators(&series(&closes));
        let truncated = add_indicators(&series(&closes[..35]));

        for column in FrameColumn::ALL {
            for i in 0..35 {
                match (full.value(column, i), truncated.value(column, i)) {
                    (Some(a), Some(b)) => assert_relative_eq!(a, b, epsilon = 1e-9),
                    (a, b) => assert_eq!(a, b, "{} at {}", column, i),
                }
            }
        }
    }

    #[test]
    fn with_columns_fills_missing_and_checks_length() {
        let frame = IndicatorFrame::with_columns(
            series(&[1.0, 2.0]),
            [(FrameColumn::Rsi, vec![Some(10.0), None])],
        )
        .unwrap();
        assert_eq!(frame.value(FrameColumn::Rsi, 0), Some(10.0));
        assert_eq!(frame.value(FrameColumn::Adx, 0), None);

        let err =
            IndicatorFrame::with_columns(series(&[1.0, 2.0]), [(FrameColumn::Rsi, vec![None])])
                .unwrap_err();
        assert!(matches!(err, TallyError::LengthMismatch { .. }));
    }

    #[test]
    fn close_masks_undefined() {
        let frame = add_indicators(&series(&[1.0, f64::NAN]));
        assert_eq!(frame.close(0), Some(1.0));
        assert_eq!(frame.close(1), None);
        assert_eq!(frame.close(5), None);
    }

    #[test]
    fn labels() {
        assert_eq!(FrameColumn::MacdSignal.label(), "MACD_Signal");
        assert_eq!(FrameColumn::StochK.to_string(), "%K");
        assert_eq!(FrameColumn::BbLow.label(), "BB_Low");
    }
}
