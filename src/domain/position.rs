//! Position state carried across bars.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Fractional return of a round trip, signed by direction.
    pub fn pnl_fraction(self, entry_price: f64, exit_price: f64) -> f64 {
        match self {
            Side::Long => (exit_price - entry_price) / entry_price,
            Side::Short => (entry_price - exit_price) / entry_price,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// The only mutable state of a simulation run besides the ledger. The entry
/// price exists only while a position is open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Open { side: Side, entry_price: f64 },
}

impl Position {
    pub fn open(side: Side, entry_price: f64) -> Self {
        Position::Open { side, entry_price }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Position::Flat => None,
            Position::Open { side, .. } => Some(*side),
        }
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            Position::Flat => None,
            Position::Open { entry_price, .. } => Some(*entry_price),
        }
    }

    /// Unrealised fractional return at `price`; zero when flat.
    pub fn unrealized_fraction(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Open { side, entry_price } => side.pnl_fraction(*entry_price, price),
        }
    }
}

/// Marks the bar on which a position was opened. Entries are not trade
/// events; they are reported separately for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMarker {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub price: f64,
}
