//! Strategy policies.
//!
//! A policy is a pure rule set: given the current bar, its indicator values
//! and the open position, it answers "exit?" and "enter, which side?". The
//! single state machine in [`crate::domain::backtest`] drives every policy, and
//! the current-signal derivation reuses the same entry rule.

pub mod ema_cross;
pub mod rsi_reversal;
pub mod rsi_trend_stop;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::BackscanError;
use crate::domain::indicator::{IndicatorFrame, IndicatorType};
use crate::domain::ohlcv::Bar;
use crate::domain::position::Side;
use crate::domain::signal::Signal;
use crate::domain::trade::ExitReason;

pub use ema_cross::EmaCross;
pub use rsi_reversal::RsiReversal;
pub use rsi_trend_stop::RsiTrendStop;

/// Read-only view of one bar and its aligned indicator values, with access to
/// the previous bar's values for crossing rules.
#[derive(Debug, Clone, Copy)]
pub struct BarView<'a> {
    bars: &'a [Bar],
    frame: &'a IndicatorFrame,
    index: usize,
}

impl<'a> BarView<'a> {
    /// `index` must be a valid position in `bars`.
    pub fn new(bars: &'a [Bar], frame: &'a IndicatorFrame, index: usize) -> Self {
        debug_assert!(index < bars.len());
        Self { bars, frame, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bar(&self) -> &'a Bar {
        &self.bars[self.index]
    }

    pub fn close(&self) -> f64 {
        self.bar().close
    }

    pub fn value(&self, indicator: &IndicatorType) -> Option<f64> {
        self.frame.value(indicator, self.index)
    }

    /// Previous bar's value; undefined on the first bar.
    pub fn prev_value(&self, indicator: &IndicatorType) -> Option<f64> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.frame.value(indicator, i))
    }

    /// True when every listed indicator is defined on this bar.
    pub fn all_defined(&self, indicators: &[IndicatorType]) -> bool {
        indicators.iter().all(|ind| self.value(ind).is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitDecision {
    pub pnl_fraction: f64,
    pub reason: Option<ExitReason>,
}

impl ExitDecision {
    pub fn at_close(view: &BarView<'_>, side: Side, entry_price: f64, reason: Option<ExitReason>) -> Self {
        Self {
            pnl_fraction: side.pnl_fraction(entry_price, view.close()),
            reason,
        }
    }
}

pub trait Policy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Indicator series this policy reads.
    fn indicators(&self) -> Vec<IndicatorType>;

    /// Bars skipped before the policy is first consulted.
    fn warmup_bars(&self) -> usize;

    fn should_exit(&self, view: &BarView<'_>, side: Side, entry_price: f64) -> Option<ExitDecision>;

    fn should_enter(&self, view: &BarView<'_>) -> Option<Side>;

    /// Text inside the parentheses of a "Buy (...)" / "Sell (...)" signal.
    fn entry_rationale(&self, side: Side) -> &'static str;

    /// Signal reported when no entry condition holds on the last bar.
    fn idle_signal(&self, _view: &BarView<'_>) -> Signal {
        Signal::Hold { bias: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "RSI v1")]
    RsiV1,
    #[serde(rename = "RSI v2 (Smart)", alias = "RSI v2")]
    RsiV2,
    #[serde(rename = "EMA Cross")]
    EmaCross,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::RsiV1, StrategyKind::RsiV2, StrategyKind::EmaCross];

    /// Config-file identifier.
    pub fn slug(self) -> &'static str {
        match self {
            StrategyKind::RsiV1 => "rsi_v1",
            StrategyKind::RsiV2 => "rsi_v2",
            StrategyKind::EmaCross => "ema_cross",
        }
    }

    /// Policy with the standard parameters for this strategy.
    pub fn policy(self) -> Box<dyn Policy> {
        match self {
            StrategyKind::RsiV1 => Box::new(RsiReversal::default()),
            StrategyKind::RsiV2 => Box::new(RsiTrendStop::default()),
            StrategyKind::EmaCross => Box::new(EmaCross::default()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::RsiV1 => "RSI v1",
            StrategyKind::RsiV2 => "RSI v2 (Smart)",
            StrategyKind::EmaCross => "EMA Cross",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for StrategyKind {
    type Err = BackscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        StrategyKind::ALL
            .into_iter()
            .find(|k| {
                needle.eq_ignore_ascii_case(k.slug()) || needle.eq_ignore_ascii_case(&k.to_string())
            })
            .or_else(|| match needle.to_ascii_lowercase().as_str() {
                "rsi" | "rsi v1" => Some(StrategyKind::RsiV1),
                "rsi v2" => Some(StrategyKind::RsiV2),
                "ema" => Some(StrategyKind::EmaCross),
                _ => None,
            })
            .ok_or_else(|| BackscanError::UnknownStrategy(needle.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars(n: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| Bar {
                timestamp: start + chrono::Duration::hours(i as i64),
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0 + i as f64,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn bar_view_prev_value_on_first_bar_is_undefined() {
        let bars = bars(3);
        let frame = IndicatorFrame::new(3)
            .with_values(IndicatorType::Rsi(14), vec![Some(20.0), Some(40.0), None]);
        let first = BarView::new(&bars, &frame, 0);
        assert_eq!(first.prev_value(&IndicatorType::Rsi(14)), None);

        let second = BarView::new(&bars, &frame, 1);
        assert_eq!(second.prev_value(&IndicatorType::Rsi(14)), Some(20.0));
        assert_eq!(second.value(&IndicatorType::Rsi(14)), Some(40.0));
        assert!((second.close() - 101.0).abs() < f64::EPSILON);

        let third = BarView::new(&bars, &frame, 2);
        assert!(!third.all_defined(&[IndicatorType::Rsi(14)]));
    }

    #[test]
    fn strategy_kind_parses_slugs_and_names() {
        assert_eq!("rsi_v1".parse::<StrategyKind>().unwrap(), StrategyKind::RsiV1);
        assert_eq!("RSI v2 (Smart)".parse::<StrategyKind>().unwrap(), StrategyKind::RsiV2);
        assert_eq!("ema cross".parse::<StrategyKind>().unwrap(), StrategyKind::EmaCross);
        assert_eq!("EMA".parse::<StrategyKind>().unwrap(), StrategyKind::EmaCross);
        assert!(matches!(
            "macd".parse::<StrategyKind>(),
            Err(BackscanError::UnknownStrategy(s)) if s == "macd"
        ));
    }

    #[test]
    fn strategy_kind_serde_uses_display_names() {
        assert_eq!(
            serde_json::to_string(&StrategyKind::RsiV2).unwrap(),
            "\"RSI v2 (Smart)\""
        );
        let k: StrategyKind = serde_json::from_str("\"EMA Cross\"").unwrap();
        assert_eq!(k, StrategyKind::EmaCross);
    }

    #[test]
    fn policies_report_their_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.policy().kind(), kind);
        }
    }
}
