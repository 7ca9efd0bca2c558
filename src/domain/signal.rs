//! Point-in-time signal at the last bar of a series.
//!
//! Reuses the policy's own entry rule on the final bar (with the previous bar
//! available for crossings), so the reported signal can never drift from the
//! rule the simulation trades on.

use std::fmt;

use crate::domain::indicator::IndicatorFrame;
use crate::domain::ohlcv::Bar;
use crate::domain::position::Side;
use crate::domain::strategy::{BarView, Policy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBias {
    Bull,
    Bear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy { rationale: &'static str },
    Sell { rationale: &'static str },
    Hold { bias: Option<TrendBias> },
}

impl Signal {
    pub fn hold() -> Self {
        Signal::Hold { bias: None }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy { rationale } => write!(f, "Buy ({})", rationale),
            Signal::Sell { rationale } => write!(f, "Sell ({})", rationale),
            Signal::Hold { bias: None } => write!(f, "Hold"),
            Signal::Hold {
                bias: Some(TrendBias::Bull),
            } => write!(f, "Hold (Bull)"),
            Signal::Hold {
                bias: Some(TrendBias::Bear),
            } => write!(f, "Hold (Bear)"),
        }
    }
}

/// Signal implied by `policy` at the last bar. An empty series holds.
pub fn current_signal(policy: &dyn Policy, bars: &[Bar], frame: &IndicatorFrame) -> Signal {
    let Some(last) = bars.len().checked_sub(1) else {
        return Signal::hold();
    };
    let view = BarView::new(bars, frame, last);
    match policy.should_enter(&view) {
        Some(side @ Side::Long) => Signal::Buy {
            rationale: policy.entry_rationale(side),
        },
        Some(side @ Side::Short) => Signal::Sell {
            rationale: policy.entry_rationale(side),
        },
        None => policy.idle_signal(&view),
    }
}
