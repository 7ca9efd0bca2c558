//! Property tests for replay determinism and the single-position invariant.

mod common;

use backscan::domain::backtest::{simulate, step};
use backscan::domain::indicator::compute_indicators;
use backscan::domain::metrics::{aggregate, Ledger, INITIAL_CAPITAL};
use backscan::domain::position::Position;
use backscan::domain::strategy::{BarView, Policy, StrategyKind};
use backscan::domain::trade::{TradeEvent, TradeKind};
use common::*;
use proptest::prelude::*;

fn closes_strategy() -> impl Strategy<Value = Vec<f64>> {
    // Random walk in percent steps keeps prices positive.
    prop::collection::vec(-0.04f64..0.04, 150..320).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|s| {
                price *= 1.0 + s;
                price
            })
            .collect()
    })
}

fn strategy_kind() -> impl Strategy<Value = StrategyKind> {
    prop::sample::select(StrategyKind::ALL.to_vec())
}

fn trade_events() -> impl Strategy<Value = Vec<TradeEvent>> {
    prop::collection::vec(-0.5f64..0.5, 0..40).prop_map(|pnls| {
        pnls.into_iter()
            .enumerate()
            .map(|(i, pnl)| TradeEvent {
                timestamp: format!("2024-03-{:02} 12:00:00", i % 28 + 1),
                kind: TradeKind::Exit,
                pnl_fraction: pnl,
                reason: None,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn aggregate_is_deterministic(trades in trade_events()) {
        let first = aggregate(INITIAL_CAPITAL, &trades);
        let second = aggregate(INITIAL_CAPITAL, &trades);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first.trade_count, trades.len());
        prop_assert!((0.0..=100.0).contains(&first.win_rate_pct));
    }

    #[test]
    fn ledger_matches_aggregate(trades in trade_events()) {
        let mut ledger = Ledger::new(INITIAL_CAPITAL);
        for t in &trades {
            ledger.record(t);
        }
        prop_assert_eq!(ledger.summary(), aggregate(INITIAL_CAPITAL, &trades));
    }

    #[test]
    fn at_most_one_position_open(closes in closes_strategy(), kind in strategy_kind()) {
        let bars = bars_from_closes(&closes);
        let policy = kind.policy();
        let frame = compute_indicators(&bars, &policy.indicators());

        let mut position = Position::Flat;
        let mut open = 0i64;
        for index in policy.warmup_bars()..bars.len() {
            let view = BarView::new(&bars, &frame, index);
            let outcome = step(position, policy.as_ref(), &view);
            if outcome.exit.is_some() {
                prop_assert!(!position.is_flat());
                open -= 1;
            }
            if outcome.entry.is_some() {
                open += 1;
            }
            prop_assert!(open == 0 || open == 1);
            prop_assert_eq!(open == 1, !outcome.position.is_flat());
            position = outcome.position;
        }
    }

    #[test]
    fn simulation_summary_replays(closes in closes_strategy(), kind in strategy_kind()) {
        let bars = bars_from_closes(&closes);
        let policy = kind.policy();
        let frame = compute_indicators(&bars, &policy.indicators());
        let run = simulate(&bars, &frame, policy.as_ref(), INITIAL_CAPITAL);

        prop_assert_eq!(run.summary, aggregate(INITIAL_CAPITAL, &run.trades));
        let opened = run.entries.len();
        let closed = run.trades.len();
        prop_assert!(opened == closed || opened == closed + 1);
        prop_assert_eq!(opened == closed + 1, !run.final_position.is_flat());
    }
}
