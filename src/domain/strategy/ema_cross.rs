//! Trend crossover ("EMA Cross").
//!
//! Fast EMA(25) against slow EMA(120). An upward cross opens long and closes
//! short; a downward cross opens short and closes long.

use crate::domain::indicator::IndicatorType;
use crate::domain::position::Side;
use crate::domain::signal::{Signal, TrendBias};
use crate::domain::strategy::{BarView, ExitDecision, Policy, StrategyKind};

#[derive(Debug, Clone, PartialEq)]
pub struct EmaCross {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for EmaCross {
    fn default() -> Self {
        EmaCross {
            fast_period: 25,
            slow_period: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Up,
    Down,
}

impl EmaCross {
    fn fast(&self) -> IndicatorType {
        IndicatorType::Ema(self.fast_period)
    }

    fn slow(&self) -> IndicatorType {
        IndicatorType::Ema(self.slow_period)
    }

    fn cross(&self, view: &BarView<'_>) -> Option<Cross> {
        let fast = view.value(&self.fast())?;
        let slow = view.value(&self.slow())?;
        let prev_fast = view.prev_value(&self.fast())?;
        let prev_slow = view.prev_value(&self.slow())?;

        if prev_fast <= prev_slow && fast > slow {
            Some(Cross::Up)
        } else if prev_fast >= prev_slow && fast < slow {
            Some(Cross::Down)
        } else {
            None
        }
    }
}

impl Policy for EmaCross {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmaCross
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![self.fast(), self.slow()]
    }

    fn warmup_bars(&self) -> usize {
        self.slow_period
    }

    fn should_exit(&self, view: &BarView<'_>, side: Side, entry_price: f64) -> Option<ExitDecision> {
        let hit = match (side, self.cross(view)?) {
            (Side::Long, Cross::Down) | (Side::Short, Cross::Up) => true,
            _ => false,
        };
        hit.then(|| ExitDecision::at_close(view, side, entry_price, None))
    }

    fn should_enter(&self, view: &BarView<'_>) -> Option<Side> {
        match self.cross(view)? {
            Cross::Up => Some(Side::Long),
            Cross::Down => Some(Side::Short),
        }
    }

    fn entry_rationale(&self, side: Side) -> &'static str {
        match side {
            Side::Long => "Golden Cross",
            Side::Short => "Dead Cross",
        }
    }

    fn idle_signal(&self, view: &BarView<'_>) -> Signal {
        let bias = match (view.value(&self.fast()), view.value(&self.slow())) {
            (Some(fast), Some(slow)) if fast > slow => Some(TrendBias::Bull),
            (Some(_), Some(_)) => Some(TrendBias::Bear),
            _ => None,
        };
        Signal::Hold { bias }
    }
}
