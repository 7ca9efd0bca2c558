//! Trade ledger and performance metrics.
//!
//! Metrics come from one replay: the balance starts at the initial capital and
//! is multiplied by `(1 + pnl_fraction)` for each event in the order given.
//! [`aggregate`] is pure, so windowed re-aggregation calls it on a filtered
//! subset and gets numbers consistent with the full run.

use serde::{Deserialize, Serialize};

use crate::domain::trade::TradeEvent;

pub const INITIAL_CAPITAL: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub final_balance: f64,
    pub return_pct: f64,
    pub win_rate_pct: f64,
    pub trade_count: usize,
}

impl Summary {
    /// Zero-trade result: balance unchanged, every percentage 0.
    pub fn empty(initial_capital: f64) -> Self {
        Summary {
            final_balance: initial_capital,
            return_pct: 0.0,
            win_rate_pct: 0.0,
            trade_count: 0,
        }
    }
}

/// Running, fully compounding balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_capital: f64,
    balance: f64,
    trades: usize,
    wins: usize,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            initial_capital,
            balance: initial_capital,
            trades: 0,
            wins: 0,
        }
    }

    pub fn record(&mut self, event: &TradeEvent) {
        self.apply(event, 0.0);
    }

    /// Record an event net of a flat round-trip fee, given as a fraction.
    pub fn record_with_fee(&mut self, event: &TradeEvent, fee_fraction: f64) {
        self.apply(event, fee_fraction);
    }

    fn apply(&mut self, event: &TradeEvent, fee_fraction: f64) {
        self.balance *= (1.0 + event.pnl_fraction) * (1.0 - fee_fraction);
        self.trades += 1;
        if event.is_win() {
            self.wins += 1;
        }
    }

    pub fn summary(&self) -> Summary {
        if self.trades == 0 {
            return Summary::empty(self.initial_capital);
        }
        let return_pct = if self.initial_capital > 0.0 {
            (self.balance - self.initial_capital) / self.initial_capital * 100.0
        } else {
            0.0
        };
        Summary {
            final_balance: self.balance,
            return_pct,
            win_rate_pct: self.wins as f64 / self.trades as f64 * 100.0,
            trade_count: self.trades,
        }
    }
}

pub fn aggregate<'a, I>(initial_capital: f64, trades: I) -> Summary
where
    I: IntoIterator<Item = &'a TradeEvent>,
{
    let mut ledger = Ledger::new(initial_capital);
    for event in trades {
        ledger.record(event);
    }
    ledger.summary()
}

/// Same replay with `fee_fraction` deducted on every round trip. A trade's
/// win/loss classification uses its gross return.
pub fn aggregate_with_fee<'a, I>(initial_capital: f64, trades: I, fee_fraction: f64) -> Summary
where
    I: IntoIterator<Item = &'a TradeEvent>,
{
    let mut ledger = Ledger::new(initial_capital);
    for event in trades {
        ledger.record_with_fee(event, fee_fraction);
    }
    ledger.summary()
}
