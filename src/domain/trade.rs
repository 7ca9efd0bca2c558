//! Trade events emitted by the position state machine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::timestamp::{format_timestamp, parse_timestamp};

/// Only exits are recorded; an entry is implied by the exit that closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TradeKind {
    #[default]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "Stop Loss")]
    StopLoss,
    #[serde(
        rename = "Take Profit",
        alias = "Take Profit (RSI > 70)",
        alias = "Take Profit (RSI < 30)"
    )]
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "Stop Loss"),
            ExitReason::TakeProfit => write!(f, "Take Profit"),
        }
    }
}

/// One realised round trip.
///
/// The timestamp is kept as the text that was persisted so that records read
/// back from disk survive even when a timestamp is malformed; windowed
/// re-aggregation skips such events instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    #[serde(alias = "time")]
    pub timestamp: String,
    #[serde(alias = "type", default)]
    pub kind: TradeKind,
    #[serde(alias = "pnl")]
    pub pnl_fraction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExitReason>,
}

impl TradeEvent {
    pub fn exit(timestamp: NaiveDateTime, pnl_fraction: f64, reason: Option<ExitReason>) -> Self {
        Self {
            timestamp: format_timestamp(timestamp),
            kind: TradeKind::Exit,
            pnl_fraction,
            reason,
        }
    }

    /// Timezone-naive timestamp, `None` if the stored text is malformed.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }

    pub fn is_win(&self) -> bool {
        self.pnl_fraction > 0.0
    }
}
