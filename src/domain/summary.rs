//! Portfolio summary over a set of result records.
//!
//! The fee-adjusted amounts spread each record's total return evenly over its
//! trade count and compound that average once per trade. This only
//! approximates a per-trade fee; the exact figure for a single record is
//! [`crate::domain::metrics::aggregate_with_fee`] over its trade history.

use serde::Serialize;

use crate::domain::record::ResultRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub records: usize,
    pub total_trades: usize,
    /// Win rate weighted by each record's trade count.
    pub weighted_win_rate_pct: f64,
    pub mean_return_pct: f64,
    pub initial_amount: f64,
    pub final_amount_before_fee: f64,
    pub final_amount_after_fee: f64,
    pub fee_cost: f64,
}

impl PortfolioSummary {
    /// `fee_fraction` is the round-trip fee, e.g. 0.001 for 0.1%.
    pub fn from_records(records: &[ResultRecord], initial_amount: f64, fee_fraction: f64) -> Self {
        let total_trades: usize = records.iter().map(|r| r.trade_count).sum();

        let weighted_win_rate_pct = if total_trades > 0 {
            records
                .iter()
                .map(|r| r.win_rate_pct * r.trade_count as f64)
                .sum::<f64>()
                / total_trades as f64
        } else {
            0.0
        };

        let mean_return_pct = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.return_pct).sum::<f64>() / records.len() as f64
        };

        let mut before_fee = initial_amount;
        let mut after_fee = initial_amount;
        for record in records.iter().filter(|r| r.trade_count > 0) {
            let per_trade = record.return_pct / 100.0 / record.trade_count as f64;
            for _ in 0..record.trade_count {
                before_fee *= 1.0 + per_trade;
                after_fee *= (1.0 + per_trade) * (1.0 - fee_fraction);
            }
        }

        PortfolioSummary {
            records: records.len(),
            total_trades,
            weighted_win_rate_pct,
            mean_return_pct,
            initial_amount,
            final_amount_before_fee: before_fee,
            final_amount_after_fee: after_fee,
            fee_cost: before_fee - after_fee,
        }
    }

    pub fn return_before_fee_pct(&self) -> f64 {
        self.pct_of_initial(self.final_amount_before_fee)
    }

    pub fn return_after_fee_pct(&self) -> f64 {
        self.pct_of_initial(self.final_amount_after_fee)
    }

    fn pct_of_initial(&self, amount: f64) -> f64 {
        if self.initial_amount > 0.0 {
            (amount - self.initial_amount) / self.initial_amount * 100.0
        } else {
            0.0
        }
    }
}
