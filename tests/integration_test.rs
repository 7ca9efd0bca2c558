//! Integration tests.
//!
//! Tests cover:
//! - Engine behaviour on hand-built indicator frames (entry timing, stop-loss
//!   precedence, strict crossovers)
//! - Windowed re-aggregation at calendar boundaries
//! - Batch orchestration with skipped units
//! - CSV files through the batch to a JSON results file and back

mod common;

use approx::assert_relative_eq;
use backscan::adapters::csv_adapter::CsvAdapter;
use backscan::adapters::json_result_adapter::JsonResultAdapter;
use backscan::domain::asset::{Asset, Interval};
use backscan::domain::backtest::{run_backtest, BacktestConfig};
use backscan::domain::batch::{run_batch, BatchConfig};
use backscan::domain::error::BackscanError;
use backscan::domain::indicator::{IndicatorFrame, IndicatorType};
use backscan::domain::metrics::{aggregate, INITIAL_CAPITAL};
use backscan::domain::position::{Position, Side};
use backscan::domain::reaggregate::reaggregate;
use backscan::domain::strategy::{EmaCross, RsiTrendStop, StrategyKind};
use backscan::domain::trade::{ExitReason, TradeEvent, TradeKind};
use backscan::domain::window::{CalendarPeriod, Window, WindowSpec};
use backscan::ports::data_port::DataPort;
use backscan::ports::result_port::ResultPort;
use common::*;
use std::fs;
use std::str::FromStr;

fn trade(timestamp: &str, pnl: f64) -> TradeEvent {
    TradeEvent {
        timestamp: timestamp.to_string(),
        kind: TradeKind::Exit,
        pnl_fraction: pnl,
        reason: None,
    }
}

mod engine_scenarios {
    use super::*;

    /// Frame for RSI v2 with a flat trend line under a flat close.
    fn rsi_v2_frame(rsi: Vec<Option<f64>>) -> IndicatorFrame {
        let len = rsi.len();
        IndicatorFrame::new(len)
            .with_values(IndicatorType::Rsi(14), rsi)
            .with_values(IndicatorType::Ema(200), vec![Some(90.0); len])
    }

    #[test]
    fn rsi_v2_enters_long_on_recovery_through_oversold() {
        let bars = bars_from_closes(&[100.0; 250]);
        let rsi: Vec<Option<f64>> = (0..250)
            .map(|i| match i {
                210..=214 => Some(25.0),
                215 => Some(35.0),
                _ => Some(50.0),
            })
            .collect();
        let frame = rsi_v2_frame(rsi);
        let policy = RsiTrendStop::default();

        let run = run_backtest(&bars, &frame, &policy, &BacktestConfig::default()).unwrap();

        assert_eq!(run.entries.len(), 1);
        let entry = &run.entries[0];
        assert_eq!(entry.index, 215);
        assert_eq!(entry.side, Side::Long);
        assert_eq!(entry.price, 100.0);
        assert_eq!(entry.timestamp, bars[215].timestamp);
        assert!(run.trades.is_empty());
        assert_eq!(run.final_position, Position::open(Side::Long, 100.0));
        assert_eq!(run.summary.trade_count, 0);
        assert_eq!(run.summary.final_balance, INITIAL_CAPITAL);
    }

    #[test]
    fn stop_loss_wins_over_take_profit_on_the_same_bar() {
        let mut closes = vec![100.0; 203];
        closes[202] = 97.0;
        let bars = bars_from_closes(&closes);
        let rsi: Vec<Option<f64>> = (0..203)
            .map(|i| match i {
                200 => Some(25.0),
                201 => Some(35.0),
                202 => Some(75.0),
                _ => Some(50.0),
            })
            .collect();
        let frame = rsi_v2_frame(rsi);

        let run = run_backtest(&bars, &frame, &RsiTrendStop::default(), &BacktestConfig::default())
            .unwrap();

        assert_eq!(run.trades.len(), 1);
        let exit = &run.trades[0];
        assert_eq!(exit.reason, Some(ExitReason::StopLoss));
        assert_relative_eq!(exit.pnl_fraction, -0.03, epsilon = 1e-12);
        assert_eq!(exit.timestamp, "2024-01-09 10:00:00");
        assert!(run.final_position.is_flat());
        assert_relative_eq!(run.summary.return_pct, -3.0, epsilon = 1e-9);
        assert_eq!(run.summary.win_rate_pct, 0.0);
    }

    #[test]
    fn ema_cross_needs_a_strict_crossing() {
        let n = 200;
        let bars = bars_from_closes(&vec![100.0; n]);
        // Fast rides level with slow over 140..160, breaks above at 160 and
        // drops back below at 170.
        let fast: Vec<Option<f64>> = (0..n)
            .map(|i| match i {
                140..=159 => Some(100.0),
                160..=169 => Some(101.0),
                _ => Some(99.0),
            })
            .collect();
        let slow = vec![Some(100.0); n];
        let frame = IndicatorFrame::new(n)
            .with_values(IndicatorType::Ema(25), fast)
            .with_values(IndicatorType::Ema(120), slow);

        let run = run_backtest(&bars, &frame, &EmaCross::default(), &BacktestConfig::default())
            .unwrap();

        let entered: Vec<(usize, Side)> = run.entries.iter().map(|e| (e.index, e.side)).collect();
        assert_eq!(entered, vec![(160, Side::Long), (170, Side::Short)]);
        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].timestamp, bars[170].timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
        assert_eq!(run.final_position.side(), Some(Side::Short));
    }

    #[test]
    fn short_series_is_refused() {
        let bars = zigzag(199);
        let frame = IndicatorFrame::new(bars.len());
        let err = run_backtest(&bars, &frame, &EmaCross::default(), &BacktestConfig::default())
            .unwrap_err();
        assert_eq!((err.bars, err.minimum), (199, 200));
    }
}

mod windows {
    use super::*;

    #[test]
    fn empty_window_is_all_zero() {
        let trades = vec![trade("2024-03-01 10:00:00", 0.05)];
        let window = Window::new(dt(2025, 1, 1, 0, 0, 0), dt(2025, 2, 1, 0, 0, 0));
        let summary = reaggregate(&trades, &window, INITIAL_CAPITAL);
        assert_eq!(summary.return_pct, 0.0);
        assert_eq!(summary.win_rate_pct, 0.0);
        assert_eq!(summary.trade_count, 0);
        assert_eq!(summary.final_balance, INITIAL_CAPITAL);
    }

    #[test]
    fn first_half_boundaries_are_inclusive_to_the_second() {
        let trades = vec![
            trade("2023-12-31 23:59:59", 0.50),
            trade("2024-01-01 00:00:00", 0.10),
            trade("2024-06-30 23:59:59", -0.05),
            trade("2024-07-01 00:00:00", 0.50),
        ];
        let spec = WindowSpec::Calendar(CalendarPeriod::from_str("2024 상반기").unwrap());
        let window = spec.resolve(dt(2030, 1, 1, 0, 0, 0)).unwrap();
        let summary = reaggregate(&trades, &window, INITIAL_CAPITAL);

        assert_eq!(summary.trade_count, 2);
        assert_relative_eq!(summary.return_pct, 4.5, epsilon = 1e-9);
        assert_relative_eq!(summary.win_rate_pct, 50.0);
    }

    #[test]
    fn reaggregation_uses_the_same_aggregator() {
        let trades = vec![
            trade("2024-02-10 09:00:00", 0.02),
            trade("2024-02-11 09:00:00+09:00", -0.01),
            trade("garbage", 0.90),
        ];
        let window = CalendarPeriod::from_str("2024-02").unwrap().window().unwrap();
        let expected = aggregate(INITIAL_CAPITAL, &trades[..2]);
        assert_eq!(reaggregate(&trades, &window, INITIAL_CAPITAL), expected);
    }
}

mod batch_pipeline {
    use super::*;

    fn config(assets: Vec<Asset>, intervals: Vec<Interval>) -> BatchConfig {
        BatchConfig {
            intervals,
            assets,
            workers: 2,
            ..BatchConfig::default()
        }
    }

    #[test]
    fn failing_and_short_units_are_skipped() {
        let port = MockDataPort::new()
            .with_bars("AAA", Interval::H1, zigzag(320))
            .with_bars("BBB", Interval::H1, zigzag(120))
            .with_error("CCC", "connection reset");
        let batch = config(
            vec![
                Asset::new("Alpha", "AAA", "Stock"),
                Asset::new("Beta", "BBB", "Stock"),
                Asset::new("Gamma", "CCC", "Coin"),
            ],
            vec![Interval::H1],
        );

        let (records, report) = run_batch(&port, &batch, dt(2024, 7, 1, 9, 0, 0)).unwrap();

        assert_eq!(records.len(), StrategyKind::ALL.len());
        assert!(records.iter().all(|r| r.ticker == "AAA" && r.asset == "Alpha"));
        assert_eq!(report.units, 3);
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(skipped, vec!["BBB", "CCC"]);
        assert!(report.skipped[1].reason.contains("connection reset"));
    }

    #[test]
    fn csv_to_json_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("KRW-BTC_4h.csv"), to_csv(&zigzag(400))).unwrap();
        fs::write(data_dir.join("KRW-BTC_1d.csv"), to_csv(&zigzag(50))).unwrap();

        let mut batch = config(
            vec![Asset::new("비트코인", "KRW-BTC", "Coin")],
            vec![Interval::H4, Interval::D1, Interval::M5],
        );
        batch.data_dir = data_dir.clone();
        batch.output = dir.path().join("results.json");

        let port = CsvAdapter::new(data_dir);
        let (records, report) = run_batch(&port, &batch, dt(2024, 7, 1, 9, 0, 0)).unwrap();
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(
            port.fetch_bars("KRW-BTC", Interval::M5),
            Err(BackscanError::NoData { .. })
        ));

        let store = JsonResultAdapter::new(batch.output.clone());
        store.save(&records).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), records.len());

        for (record, original) in loaded.iter().zip(&records) {
            assert_eq!(record.interval, Interval::H4);
            assert_eq!(record.strategy, original.strategy);
            assert_eq!(record.timestamp, "2024-07-01T09:00:00");
            assert_eq!(record.trade_history.len(), original.trade_history.len());
            assert_eq!(record.current_signal, original.current_signal);
            let replay = record.replay(INITIAL_CAPITAL);
            assert_eq!(replay.trade_count, record.trade_count);
            assert_relative_eq!(replay.return_pct, record.return_pct, epsilon = 1e-9);
            assert_relative_eq!(replay.win_rate_pct, record.win_rate_pct, epsilon = 1e-9);
        }
        assert!(loaded.iter().any(|r| r.trade_count > 0));
    }
}
