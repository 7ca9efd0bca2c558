//! Instruments and bar intervals covered by a batch.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::BackscanError;

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub ticker: String,
    pub category: String,
}

impl Asset {
    pub fn new(name: impl Into<String>, ticker: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m", alias = "5분")]
    M5,
    #[serde(rename = "15m", alias = "15분")]
    M15,
    #[serde(rename = "30m", alias = "30분")]
    M30,
    #[serde(rename = "1h", alias = "1시간")]
    H1,
    #[serde(rename = "4h", alias = "4시간")]
    H4,
    #[serde(rename = "1d", alias = "1일")]
    D1,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H4,
        Interval::D1,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }

    /// Label used by earlier result files.
    pub fn legacy_label(self) -> &'static str {
        match self {
            Interval::M5 => "5분",
            Interval::M15 => "15분",
            Interval::M30 => "30분",
            Interval::H1 => "1시간",
            Interval::H4 => "4시간",
            Interval::D1 => "1일",
        }
    }

    pub fn minutes(self) -> i64 {
        match self {
            Interval::M5 => 5,
            Interval::M15 => 15,
            Interval::M30 => 30,
            Interval::H1 => 60,
            Interval::H4 => 240,
            Interval::D1 => 1440,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for Interval {
    type Err = BackscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| needle.eq_ignore_ascii_case(i.slug()) || needle == i.legacy_label())
            .or_else(|| match needle.to_ascii_lowercase().as_str() {
                "1day" | "day" | "daily" => Some(Interval::D1),
                "60m" => Some(Interval::H1),
                "240m" => Some(Interval::H4),
                _ => None,
            })
            .ok_or_else(|| BackscanError::UnknownInterval(needle.to_string()))
    }
}

/// Split a comma-separated config list, trimming blanks and dropping
/// duplicates while keeping first-seen order.
pub fn split_list(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn parse_intervals(input: &str) -> Result<Vec<Interval>, BackscanError> {
    let mut out = Vec::new();
    for token in split_list(input) {
        let interval: Interval = token.parse()?;
        if !out.contains(&interval) {
            out.push(interval);
        }
    }
    Ok(out)
}
