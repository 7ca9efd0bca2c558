//! CSV file data adapter.
//!
//! One file per series at `{base_path}/{ticker}_{interval}.csv` with a header
//! row. Columns are located by name (`timestamp`/`date`/`datetime`/`time`,
//! `open`, `high`, `low`, `close`, `volume`, case-insensitive); a file
//! without recognisable names is read positionally in that order.

use crate::domain::asset::Interval;
use crate::domain::error::BackscanError;
use crate::domain::ohlcv::{normalize_series, Bar};
use crate::domain::timestamp::parse_timestamp;
use crate::ports::data_port::DataPort;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

const TIME_HEADERS: [&str; 4] = ["timestamp", "date", "datetime", "time"];
const PRICE_HEADERS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Column index of each field: timestamp, open, high, low, close, volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns([usize; 6]);

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |names: &[&str]| -> Option<usize> {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let mut idx = [0, 1, 2, 3, 4, 5];
        if let Some(i) = find(&TIME_HEADERS) {
            idx[0] = i;
        }
        for (slot, name) in PRICE_HEADERS.iter().enumerate() {
            if let Some(i) = find(&[*name]) {
                idx[slot + 1] = i;
            }
        }
        Columns(idx)
    }
}

#[derive(Debug, Clone, Copy)]
struct Location<'a> {
    origin: &'a str,
    line: usize,
}

fn field<'r>(
    record: &'r csv::StringRecord,
    columns: Columns,
    slot: usize,
    name: &str,
    at: Location<'_>,
) -> Result<&'r str, BackscanError> {
    record
        .get(columns.0[slot])
        .map(str::trim)
        .ok_or_else(|| BackscanError::DataSource {
            reason: format!("{}:{}: missing {} column", at.origin, at.line, name),
        })
}

/// Numeric field; an empty volume reads as zero.
fn number(
    record: &csv::StringRecord,
    columns: Columns,
    slot: usize,
    name: &str,
    at: Location<'_>,
) -> Result<f64, BackscanError> {
    let raw = field(record, columns, slot, name, at)?;
    if slot == 5 && raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse().map_err(|_| BackscanError::DataSource {
        reason: format!("{}:{}: invalid {} value '{}'", at.origin, at.line, name, raw),
    })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, ticker: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", ticker, interval.slug()))
    }

    /// Read a single file directly, sorted and de-duplicated.
    pub fn read_file(path: &Path) -> Result<Vec<Bar>, BackscanError> {
        let content = fs::read_to_string(path).map_err(|e| BackscanError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> Result<Vec<Bar>, BackscanError> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let columns = {
            let headers = rdr.headers().map_err(|e| BackscanError::DataSource {
                reason: format!("{}: CSV header error: {}", origin, e),
            })?;
            Columns::from_headers(headers)
        };

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| BackscanError::DataSource {
                reason: format!("{}: CSV parse error: {}", origin, e),
            })?;
            // Header is line 1.
            let line = row + 2;

            let at = Location { origin, line };
            let raw_ts = field(&record, columns, 0, "timestamp", at)?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| BackscanError::DataSource {
                reason: format!("{}:{}: invalid timestamp '{}'", origin, line, raw_ts),
            })?;

            bars.push(Bar {
                timestamp,
                open: number(&record, columns, 1, "open", at)?,
                high: number(&record, columns, 2, "high", at)?,
                low: number(&record, columns, 3, "low", at)?,
                close: number(&record, columns, 4, "close", at)?,
                volume: number(&record, columns, 5, "volume", at)?,
            });
        }

        Ok(normalize_series(bars))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, ticker: &str, interval: Interval) -> Result<Vec<Bar>, BackscanError> {
        let path = self.csv_path(ticker, interval);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, &path.display().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BackscanError::NoData {
                ticker: ticker.to_string(),
                interval: interval.to_string(),
            }),
            Err(e) => Err(BackscanError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            }),
        }
    }
}
