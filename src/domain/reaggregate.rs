//! Windowed re-aggregation of persisted trade histories.

use tracing::debug;

use crate::domain::metrics::{aggregate, Summary};
use crate::domain::trade::TradeEvent;
use crate::domain::window::Window;

/// Events whose timestamp parses and falls inside `window`, in original order.
pub fn filter_trades<'a>(trades: &'a [TradeEvent], window: &Window) -> Vec<&'a TradeEvent> {
    trades
        .iter()
        .filter(|event| match event.parsed_timestamp() {
            Some(ts) => window.contains(ts),
            None => {
                debug!(timestamp = %event.timestamp, "skipping trade with malformed timestamp");
                false
            }
        })
        .collect()
}

/// Metrics of the trades inside `window`, replayed from `initial_capital`
/// with the same aggregator a full run uses.
pub fn reaggregate(trades: &[TradeEvent], window: &Window, initial_capital: f64) -> Summary {
    aggregate(initial_capital, filter_trades(trades, window))
}
