//! Oscillator reversal with trend filter and stop-loss ("RSI v2").
//!
//! Entries need an RSI crossing in the direction of the 200-period trend:
//! - close > EMA(200) and RSI crosses up through 30 (prev < 30, now >= 30): long
//! - close < EMA(200) and RSI crosses down through 70 (prev > 70, now <= 70): short
//!
//! Exits are checked in fixed order, first hit wins:
//! 1. stop-loss at 2% adverse move from entry
//! 2. take-profit on RSI > 70 (long) / RSI < 30 (short)

use crate::domain::indicator::IndicatorType;
use crate::domain::position::Side;
use crate::domain::strategy::{BarView, ExitDecision, Policy, StrategyKind};
use crate::domain::trade::ExitReason;

#[derive(Debug, Clone, PartialEq)]
pub struct RsiTrendStop {
    pub rsi_period: usize,
    pub trend_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    /// Adverse move, as a fraction of entry price, that triggers the stop.
    pub stop_loss: f64,
}

impl Default for RsiTrendStop {
    fn default() -> Self {
        RsiTrendStop {
            rsi_period: 14,
            trend_period: 200,
            oversold: 30.0,
            overbought: 70.0,
            stop_loss: 0.02,
        }
    }
}

impl RsiTrendStop {
    fn rsi(&self) -> IndicatorType {
        IndicatorType::Rsi(self.rsi_period)
    }

    fn trend(&self) -> IndicatorType {
        IndicatorType::Ema(self.trend_period)
    }

    fn stop_hit(&self, side: Side, entry_price: f64, close: f64) -> bool {
        match side {
            Side::Long => close <= entry_price * (1.0 - self.stop_loss),
            Side::Short => close >= entry_price * (1.0 + self.stop_loss),
        }
    }

    fn take_profit_hit(&self, side: Side, rsi: f64) -> bool {
        match side {
            Side::Long => rsi > self.overbought,
            Side::Short => rsi < self.oversold,
        }
    }
}

impl Policy for RsiTrendStop {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RsiV2
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![self.rsi(), self.trend()]
    }

    fn warmup_bars(&self) -> usize {
        self.trend_period
    }

    fn should_exit(&self, view: &BarView<'_>, side: Side, entry_price: f64) -> Option<ExitDecision> {
        if self.stop_hit(side, entry_price, view.close()) {
            return Some(ExitDecision::at_close(
                view,
                side,
                entry_price,
                Some(ExitReason::StopLoss),
            ));
        }
        let rsi = view.value(&self.rsi())?;
        self.take_profit_hit(side, rsi).then(|| {
            ExitDecision::at_close(view, side, entry_price, Some(ExitReason::TakeProfit))
        })
    }

    fn should_enter(&self, view: &BarView<'_>) -> Option<Side> {
        let rsi = view.value(&self.rsi())?;
        let prev_rsi = view.prev_value(&self.rsi())?;
        let trend = view.value(&self.trend())?;
        let close = view.close();

        if close > trend {
            (prev_rsi < self.oversold && rsi >= self.oversold).then_some(Side::Long)
        } else if close < trend {
            (prev_rsi > self.overbought && rsi <= self.overbought).then_some(Side::Short)
        } else {
            None
        }
    }

    fn entry_rationale(&self, _side: Side) -> &'static str {
        "Trend Follow"
    }
}
