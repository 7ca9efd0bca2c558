//! Bar retrieval port trait.

use crate::domain::asset::Interval;
use crate::domain::error::BackscanError;
use crate::domain::ohlcv::Bar;

/// Source of historical bars. Implementations return bars in chronological
/// order with unique timestamps; retries and source selection are theirs.
pub trait DataPort: Send + Sync {
    fn fetch_bars(&self, ticker: &str, interval: Interval) -> Result<Vec<Bar>, BackscanError>;
}
