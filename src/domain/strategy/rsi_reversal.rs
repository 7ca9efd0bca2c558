//! Oscillator reversal ("RSI v1").
//!
//! Flat: RSI < 30 opens long, RSI > 70 opens short.
//! Long exits when RSI > 70, short exits when RSI < 30. No stop-loss.

use crate::domain::indicator::IndicatorType;
use crate::domain::position::Side;
use crate::domain::strategy::{BarView, ExitDecision, Policy, StrategyKind};

#[derive(Debug, Clone, PartialEq)]
pub struct RsiReversal {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub warmup: usize,
}

impl Default for RsiReversal {
    fn default() -> Self {
        RsiReversal {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            warmup: 120,
        }
    }
}

impl RsiReversal {
    fn rsi(&self) -> IndicatorType {
        IndicatorType::Rsi(self.period)
    }
}

impl Policy for RsiReversal {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RsiV1
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![self.rsi()]
    }

    fn warmup_bars(&self) -> usize {
        self.warmup
    }

    fn should_exit(&self, view: &BarView<'_>, side: Side, entry_price: f64) -> Option<ExitDecision> {
        let rsi = view.value(&self.rsi())?;
        let hit = match side {
            Side::Long => rsi > self.overbought,
            Side::Short => rsi < self.oversold,
        };
        hit.then(|| ExitDecision::at_close(view, side, entry_price, None))
    }

    fn should_enter(&self, view: &BarView<'_>) -> Option<Side> {
        let rsi = view.value(&self.rsi())?;
        if rsi < self.oversold {
            Some(Side::Long)
        } else if rsi > self.overbought {
            Some(Side::Short)
        } else {
            None
        }
    }

    fn entry_rationale(&self, side: Side) -> &'static str {
        match side {
            Side::Long => "OverSold",
            Side::Short => "OverBought",
        }
    }
}
