//! Indicator series aligned to a bar sequence.
//!
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: one value per bar, `None` during warm-up
//! - `IndicatorFrame`: all series a strategy needs, indexed like the bars

pub mod ema;
pub mod rsi;

use crate::domain::ohlcv::Bar;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Defined value at `index`; NaN and out-of-range count as undefined.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    len: usize,
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorFrame {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            series: HashMap::new(),
        }
    }

    /// Number of bars the frame is aligned to.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a series computed elsewhere. Shorter series are padded with
    /// undefined values, longer ones truncated, so alignment always holds.
    pub fn insert(&mut self, mut series: IndicatorSeries) {
        series.values.resize(self.len, None);
        self.series.insert(series.indicator_type, series);
    }

    /// Builder form of [`insert`](Self::insert) taking raw values.
    pub fn with_values(mut self, indicator_type: IndicatorType, values: Vec<Option<f64>>) -> Self {
        self.insert(IndicatorSeries {
            indicator_type,
            values,
        });
        self
    }

    pub fn series(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    pub fn value(&self, indicator_type: &IndicatorType, index: usize) -> Option<f64> {
        self.series.get(indicator_type).and_then(|s| s.get(index))
    }

    pub fn contains(&self, indicator_type: &IndicatorType) -> bool {
        self.series.contains_key(indicator_type)
    }
}

/// Standard indicator provider: computes every requested series from closes.
pub fn compute_indicators(bars: &[Bar], types: &[IndicatorType]) -> IndicatorFrame {
    let mut frame = IndicatorFrame::new(bars.len());
    for indicator_type in types {
        if frame.contains(indicator_type) {
            continue;
        }
        let series = match *indicator_type {
            IndicatorType::Ema(period) => ema::calculate_ema(bars, period),
            IndicatorType::Rsi(period) => rsi::calculate_rsi(bars, period),
        };
        frame.insert(series);
    }
    frame
}
