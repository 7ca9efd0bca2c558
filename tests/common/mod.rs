#![allow(dead_code)]

use backscan::domain::asset::Interval;
use backscan::domain::error::BackscanError;
pub use backscan::domain::ohlcv::Bar;
use backscan::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<(String, Interval), Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, interval: Interval, bars: Vec<Bar>) -> Self {
        self.data.insert((ticker.to_string(), interval), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, ticker: &str, interval: Interval) -> Result<Vec<Bar>, BackscanError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(BackscanError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data
            .get(&(ticker.to_string(), interval))
            .cloned()
            .ok_or_else(|| BackscanError::NoData {
                ticker: ticker.to_string(),
                interval: interval.to_string(),
            })
    }
}

pub fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// Hourly bars starting 2024-01-01 00:00 with the given closes.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = dt(2024, 1, 1, 0, 0, 0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::hours(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        })
        .collect()
}

/// Triangle wave between 100 and 140 with a 40-bar period; enough swing for
/// every strategy to trade.
pub fn zigzag_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let phase = (i % 40) as f64;
            if phase < 20.0 { 100.0 + 2.0 * phase } else { 180.0 - 2.0 * phase }
        })
        .collect()
}

pub fn zigzag(n: usize) -> Vec<Bar> {
    bars_from_closes(&zigzag_closes(n))
}

/// Bars as CSV text with the standard header.
pub fn to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
