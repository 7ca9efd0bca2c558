//! Position state machine and the simulation loop that drives it.
//!
//! One driver serves every policy. Per bar, after warm-up:
//! 1. if any indicator the policy reads is undefined, nothing happens
//! 2. an open position is offered to `should_exit`
//! 3. if the position is flat at this point, `should_enter` is consulted on
//!    the same bar and a new position opens at the close

use crate::domain::indicator::IndicatorFrame;
use crate::domain::metrics::{Ledger, Summary, INITIAL_CAPITAL};
use crate::domain::ohlcv::Bar;
use crate::domain::position::{EntryMarker, Position};
use crate::domain::strategy::{BarView, Policy};
use crate::domain::trade::TradeEvent;

/// Shortest bar series any strategy will simulate.
pub const MIN_BARS: usize = 200;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub min_bars: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: INITIAL_CAPITAL,
            min_bars: MIN_BARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("have {bars} bars, need {minimum}")]
pub struct InsufficientHistory {
    pub bars: usize,
    pub minimum: usize,
}

/// Result of feeding one bar to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub position: Position,
    pub exit: Option<TradeEvent>,
    pub entry: Option<EntryMarker>,
}

impl StepOutcome {
    fn unchanged(position: Position) -> Self {
        StepOutcome {
            position,
            exit: None,
            entry: None,
        }
    }
}

/// Advance `position` by the bar under `view`.
pub fn step(position: Position, policy: &dyn Policy, view: &BarView<'_>) -> StepOutcome {
    if !view.all_defined(&policy.indicators()) {
        return StepOutcome::unchanged(position);
    }

    let bar = view.bar();
    let mut outcome = StepOutcome::unchanged(position);

    if let Position::Open { side, entry_price } = position {
        if let Some(decision) = policy.should_exit(view, side, entry_price) {
            outcome.exit = Some(TradeEvent::exit(
                bar.timestamp,
                decision.pnl_fraction,
                decision.reason,
            ));
            outcome.position = Position::Flat;
        }
    }

    if outcome.position.is_flat() {
        if let Some(side) = policy.should_enter(view) {
            outcome.position = Position::open(side, bar.close);
            outcome.entry = Some(EntryMarker {
                index: view.index(),
                timestamp: bar.timestamp,
                side,
                price: bar.close,
            });
        }
    }

    outcome
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    pub trades: Vec<TradeEvent>,
    pub entries: Vec<EntryMarker>,
    /// Position still open after the last bar; it is not closed or counted.
    pub final_position: Position,
    pub summary: Summary,
}

/// Feed every post-warm-up bar through [`step`], without a length check.
pub fn simulate(
    bars: &[Bar],
    frame: &IndicatorFrame,
    policy: &dyn Policy,
    initial_capital: f64,
) -> BacktestRun {
    let mut position = Position::Flat;
    let mut ledger = Ledger::new(initial_capital);
    let mut trades = Vec::new();
    let mut entries = Vec::new();

    for index in policy.warmup_bars()..bars.len() {
        let view = BarView::new(bars, frame, index);
        let outcome = step(position, policy, &view);
        if let Some(event) = outcome.exit {
            ledger.record(&event);
            trades.push(event);
        }
        if let Some(marker) = outcome.entry {
            entries.push(marker);
        }
        position = outcome.position;
    }

    BacktestRun {
        trades,
        entries,
        final_position: position,
        summary: ledger.summary(),
    }
}

/// Run `policy` over `bars`, refusing series shorter than `config.min_bars`.
pub fn run_backtest(
    bars: &[Bar],
    frame: &IndicatorFrame,
    policy: &dyn Policy,
    config: &BacktestConfig,
) -> Result<BacktestRun, InsufficientHistory> {
    if bars.len() < config.min_bars {
        return Err(InsufficientHistory {
            bars: bars.len(),
            minimum: config.min_bars,
        });
    }
    Ok(simulate(bars, frame, policy, config.initial_capital))
}
