//! Integration tests across the public API.
//!
//! Tests cover:
//! - Indicator frame over realistic and degenerate series
//! - Voting over a computed frame and over synthetic rows
//! - Combinator pipeline with an aligned prediction series
//! - Backtest laws (all-Hold, round trip, no look-ahead)

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use std::path::PathBuf;
use tallytrader::cli::{run_combinator_pipeline, run_voting_pipeline};
use tallytrader::domain::backtest::{Action, BacktestConfig, run_backtest};
use tallytrader::domain::combinator::{CombinatorConfig, CombinatorInputs, combine_strategies};
use tallytrader::domain::config_validation::{DataSettings, RunSettings};
use tallytrader::domain::error::TallyError;
use tallytrader::domain::frame::{
    Availability, FrameColumn, IndicatorFrame, IndicatorParams, add_indicators,
};
use tallytrader::domain::indicator::IndicatorType;
use tallytrader::domain::voting::{Signal, VoteConfig, VoteThresholds, apply_voting};

fn settings(symbol: &str) -> RunSettings {
    RunSettings {
        data: DataSettings {
            dir: PathBuf::from("."),
            symbol: symbol.to_string(),
            start_date: None,
            end_date: None,
            predictions: None,
        },
        indicators: IndicatorParams::default(),
        voting: VoteConfig::default(),
        combinator: CombinatorConfig::default(),
        backtest: BacktestConfig {
            starting_capital: 10_000.0,
        },
    }
}

mod indicator_frame {
    use super::*;

    #[test]
    fn short_series_keeps_rows_and_flags_warmup() {
        let series = PriceSeries::new("SHORT", daily_bars(&[10.0, 11.0, 12.0, 11.5, 12.5])).unwrap();
        let frame = add_indicators(&series);

        assert_eq!(frame.len(), 5);
        for column in [FrameColumn::Rsi, FrameColumn::Adx, FrameColumn::BbLow] {
            assert!(frame.column(column).iter().all(Option::is_none));
        }
        let insufficient = frame
            .availability()
            .iter()
            .filter(|(_, a)| matches!(a, Availability::InsufficientHistory { .. }))
            .count();
        // EMA and MACD are defined from the first bar
        assert_eq!(insufficient, 4);
    }

    #[test]
    fn constant_series() {
        let series = PriceSeries::new("FLAT", daily_bars(&[50.0; 40])).unwrap();
        let frame = add_indicators(&series);

        for i in 0..40 {
            assert_eq!(frame.value(FrameColumn::Ema12, i), Some(50.0));
            assert_eq!(frame.value(FrameColumn::Macd, i), Some(0.0));
        }
        assert_relative_eq!(
            frame.value(FrameColumn::StochK, 39).unwrap(),
            50.0,
            epsilon = 1e-9
        );
        assert_eq!(frame.value(FrameColumn::Rsi, 39), Some(100.0));
    }

    #[test]
    fn undefined_close_stays_local() {
        let mut bars = daily_bars(&dip_and_recovery(60));
        bars[30].close = f64::NAN;
        let series = PriceSeries::new("GAP", bars).unwrap();
        let frame = add_indicators(&series);

        assert_eq!(frame.len(), 60);
        assert_eq!(frame.value(FrameColumn::Ema12, 30), None);
        assert!(frame.value(FrameColumn::Ema12, 31).is_some());
        assert_eq!(frame.value(FrameColumn::BbLow, 49), None);
        assert!(frame.value(FrameColumn::BbLow, 50).is_some());
    }

    #[test]
    fn custom_windows_flow_into_availability() {
        let params = IndicatorParams {
            adx_period: 5,
            ..IndicatorParams::default()
        };
        let series = PriceSeries::new("P", daily_bars(&dip_and_recovery(12))).unwrap();
        let frame = tallytrader::domain::frame::add_indicators_with(&series, &params);

        let adx = frame
            .availability()
            .iter()
            .find(|(t, _)| *t == IndicatorType::Adx(5))
            .map(|(_, a)| a.clone());
        assert_eq!(adx, Some(Availability::Available));
        assert!(frame.value(FrameColumn::Adx, 9).is_some());
    }
}

mod voting {
    use super::*;

    #[test]
    fn baseline_rules_never_sell() {
        let series = PriceSeries::new("DIP", daily_bars(&dip_and_recovery(120))).unwrap();
        let frame = add_indicators(&series);
        let sequence = apply_voting(&frame, &VoteConfig::default());

        assert_eq!(sequence.len(), 120);
        assert!(sequence.signals().iter().all(|s| *s != Signal::Sell));
        assert!(sequence.votes().iter().all(|v| (0..=5).contains(v)));
        assert!(sequence.signals().contains(&Signal::Buy));
    }

    #[test]
    fn composite_follows_votes_for_every_flag_set() {
        let series = PriceSeries::new("SYN", daily_bars(&[100.0, 80.0, 80.0])).unwrap();
        let frame = IndicatorFrame::with_columns(
            series,
            [
                (FrameColumn::Macd, vec![Some(-1.0), Some(1.0), Some(2.0)]),
                (FrameColumn::MacdSignal, vec![Some(0.0), Some(0.0), Some(0.0)]),
                (FrameColumn::BbLow, vec![Some(90.0), Some(90.0), None]),
                (FrameColumn::StochK, vec![None, Some(10.0), Some(10.0)]),
                (FrameColumn::StochD, vec![None, Some(5.0), Some(15.0)]),
                (FrameColumn::Rsi, vec![Some(20.0), Some(20.0), Some(45.0)]),
                (FrameColumn::Adx, vec![Some(30.0), None, Some(30.0)]),
            ],
        )
        .unwrap();

        for mask in 0..32u32 {
            let config = VoteConfig {
                use_macd: mask & 1 != 0,
                use_bb: mask & 2 != 0,
                use_stoch: mask & 4 != 0,
                use_rsi: mask & 8 != 0,
                use_adx: mask & 16 != 0,
                thresholds: VoteThresholds::default(),
            };
            let sequence = apply_voting(&frame, &config);

            for row in sequence.rows() {
                let expected = if row.votes >= 2 {
                    Signal::Buy
                } else if row.votes <= -2 {
                    Signal::Sell
                } else {
                    Signal::Hold
                };
                assert_eq!(row.signal, expected, "mask {:05b}", mask);
                assert_eq!(
                    row.votes,
                    row.rule_votes.iter().map(|(_, v)| v).sum::<i32>()
                );
            }
        }
    }

    #[test]
    fn all_rules_at_row_one() {
        let series = PriceSeries::new("SYN", daily_bars(&[100.0, 80.0, 80.0])).unwrap();
        let frame = IndicatorFrame::with_columns(
            series,
            [
                (FrameColumn::Macd, vec![Some(-1.0), Some(1.0), Some(2.0)]),
                (FrameColumn::MacdSignal, vec![Some(0.0), Some(0.0), Some(0.0)]),
                (FrameColumn::BbLow, vec![Some(90.0), Some(90.0), None]),
                (FrameColumn::StochK, vec![None, Some(10.0), Some(10.0)]),
                (FrameColumn::StochD, vec![None, Some(5.0), Some(15.0)]),
                (FrameColumn::Rsi, vec![Some(20.0), Some(20.0), Some(45.0)]),
                (FrameColumn::Adx, vec![Some(30.0), Some(30.0), Some(30.0)]),
            ],
        )
        .unwrap();
        let sequence = apply_voting(&frame, &VoteConfig::default());

        // row 0: RSI and ADX; row 1: all five; row 2: ADX only
        assert_eq!(sequence.votes(), vec![2, 5, 1]);
        assert_eq!(
            sequence.signals(),
            vec![Signal::Buy, Signal::Buy, Signal::Hold]
        );
    }
}

mod pipelines {
    use super::*;

    #[test]
    fn voting_pipeline_with_mock_data_port() {
        let port = MockDataPort::new().with_bars("DIP", daily_bars(&dip_and_recovery(120)));
        let (frame, signals, result) = run_voting_pipeline(&port, &settings("DIP")).unwrap();

        assert_eq!(frame.len(), 120);
        assert_eq!(signals.len(), 120);
        assert_eq!(result.history.len(), 120);

        // without sell rules the first Buy opens the only position
        let buys = result.actions.iter().filter(|a| **a == Action::Buy).count();
        assert_eq!(buys, 1);
        assert_eq!(result.trade_count, 0);
    }

    #[test]
    fn voting_pipeline_respects_date_range() {
        let port = MockDataPort::new().with_bars("DIP", daily_bars(&dip_and_recovery(120)));
        let mut settings = settings("DIP");
        settings.data.start_date = Some(date("2024-02-01"));
        settings.data.end_date = Some(date("2024-02-29"));

        let (frame, _, _) = run_voting_pipeline(&port, &settings).unwrap();
        assert_eq!(frame.len(), 29);
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let port = MockDataPort::new();
        let err = run_voting_pipeline(&port, &settings("NONE")).unwrap_err();
        assert!(matches!(err, TallyError::NoData { .. }));
    }

    #[test]
    fn data_port_errors_propagate() {
        let port = MockDataPort::new().with_error("BAD", "feed offline");
        let err = run_voting_pipeline(&port, &settings("BAD")).unwrap_err();
        assert!(matches!(err, TallyError::Data { reason } if reason == "feed offline"));
    }

    #[test]
    fn undefined_close_row_is_held() {
        let mut bars = daily_bars(&dip_and_recovery(40));
        bars[20].close = f64::NAN;
        let port = MockDataPort::new().with_bars("GAP", bars);

        let (frame, _, result) = run_voting_pipeline(&port, &settings("GAP")).unwrap();
        assert_eq!(frame.len(), 40);
        assert_eq!(result.history.len(), 40);
        assert_eq!(result.actions[20], Action::Hold);
        assert_eq!(result.history[20], result.history[19]);
    }

    #[test]
    fn undefined_close_row_is_held_in_combinator() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let mut bars = daily_bars(&closes);
        bars[55].close = f64::NAN;
        let port = MockDataPort::new().with_bars("UP", bars);
        let mut settings = settings("UP");
        settings.combinator.use_prediction = false;

        let (_, result) = run_combinator_pipeline(&port, &settings).unwrap();
        assert_eq!(result.history.len(), 60);
        assert_eq!(result.actions[55], Action::Hold);
    }

    #[test]
    fn combinator_pipeline_with_predictions() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bars = daily_bars(&closes);

        let dir = tempfile::TempDir::new().unwrap();
        let pred_path = dir.path().join("pred.csv");
        let mut content = String::from("date,predicted\n");
        for bar in &bars {
            content.push_str(&format!("{},{}\n", bar.date, bar.close * 1.05));
        }
        std::fs::write(&pred_path, content).unwrap();

        let port = MockDataPort::new().with_bars("UP", bars);
        let mut settings = settings("UP");
        settings.data.predictions = Some(pred_path);

        let (signals, result) = run_combinator_pipeline(&port, &settings).unwrap();

        // prediction Buy, RSI and MA undefined → Hold wins 2 to 1
        assert_eq!(signals[0], Signal::Hold);
        // prediction Buy, RSI Sell, MA undefined → three-way tie, prediction first
        assert_eq!(signals[14], Signal::Buy);
        // prediction Buy, RSI Sell, MA Buy
        assert_eq!(signals[59], Signal::Buy);
        assert_eq!(result.actions[14], Action::Buy);
        assert_eq!(result.trade_count, 0);
    }

    #[test]
    fn combinator_without_prediction_source_fails_before_fetching() {
        let port = MockDataPort::new().with_error("UP", "feed offline");
        let err = run_combinator_pipeline(&port, &settings("UP")).unwrap_err();
        assert!(matches!(err, TallyError::ConfigMissing { .. }));
    }

    #[test]
    fn combinator_length_mismatch_is_an_error() {
        let inputs = CombinatorInputs {
            actual: vec![Some(1.0), Some(2.0)],
            predicted: Some(vec![Some(1.0)]),
            rsi: vec![None, None],
            short_ma: vec![None, None],
            long_ma: vec![None, None],
        };
        let err = combine_strategies(&CombinatorConfig::default(), &inputs).unwrap_err();
        assert!(matches!(err, TallyError::LengthMismatch { .. }));
    }
}

mod backtest_laws {
    use super::*;

    #[test]
    fn all_hold() {
        let prices = [10.0, 12.0, 8.0, 15.0];
        let result = run_backtest(&[Signal::Hold; 4], &prices, 1000.0).unwrap();

        assert_eq!(result.history, vec![1000.0; 4]);
        assert_eq!(result.roi, 0.0);
        assert_eq!(result.max_drawdown, 0.0);
        assert_eq!(result.trade_count, 0);
    }

    #[test]
    fn buy_buy_sell() {
        let result = run_backtest(
            &[Signal::Buy, Signal::Buy, Signal::Sell],
            &[100.0, 110.0, 120.0],
            1000.0,
        )
        .unwrap();

        assert_eq!(result.actions, vec![Action::Buy, Action::Hold, Action::Sell]);
        assert_relative_eq!(result.final_value, 1200.0);
        assert_relative_eq!(result.roi, 20.0);
        assert_relative_eq!(result.win_rate, 100.0);
        assert_eq!(result.trade_count, 1);
    }

    proptest! {
        #[test]
        fn voted_backtest_does_not_look_ahead(
            closes in prop::collection::vec(20.0f64..200.0, 2..80),
            cut in 0usize..80,
        ) {
            let t = cut % closes.len();
            let full_series = PriceSeries::new("P", daily_bars(&closes)).unwrap();
            let cut_series = PriceSeries::new("P", daily_bars(&closes[..=t])).unwrap();

            let config = VoteConfig::default();
            let full = apply_voting(&add_indicators(&full_series), &config).signals();
            let cut_signals = apply_voting(&add_indicators(&cut_series), &config).signals();
            prop_assert_eq!(&full[..=t], &cut_signals[..]);

            let full_bt = run_backtest(&full, &closes, 1000.0).unwrap();
            let cut_bt = run_backtest(&cut_signals, &closes[..=t], 1000.0).unwrap();
            prop_assert_eq!(&full_bt.history[..=t], &cut_bt.history[..]);
        }
    }
}
