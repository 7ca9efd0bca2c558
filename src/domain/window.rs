//! Time windows for retrospective re-aggregation.
//!
//! Two kinds:
//! - trailing: `[now - N days, now]`
//! - calendar: a single day, month, half-year or year
//!
//! Both bounds are inclusive and timezone-naive.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::BackscanError;
use crate::domain::trade::TradeEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Window { start, end }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// `[now - days, now]`; a day count that leaves chrono's range is an
    /// invalid period.
    pub fn trailing(now: NaiveDateTime, days: i64) -> Result<Self, BackscanError> {
        Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .map(|start| Window::new(start, now))
            .ok_or_else(|| invalid(&format!("{}d", days), "day count is out of range"))
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn invalid(input: &str, reason: impl Into<String>) -> BackscanError {
    BackscanError::InvalidPeriod {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Length of a trailing window in days: `1d`, `1m` (30), `6m` (180),
/// `1y` (365) or any `Nd`.
pub fn parse_trailing_days(input: &str) -> Result<i64, BackscanError> {
    let spec = input.trim().to_ascii_lowercase();
    match spec.as_str() {
        "1m" => return Ok(30),
        "6m" => return Ok(180),
        "1y" => return Ok(365),
        _ => {}
    }
    let digits = spec
        .strip_suffix('d')
        .ok_or_else(|| invalid(input, "expected 1d, 1m, 6m, 1y or <N>d"))?;
    let days: i64 = digits
        .parse()
        .map_err(|_| invalid(input, "day count is not a number"))?;
    if days <= 0 {
        return Err(invalid(input, "day count must be positive"));
    }
    Ok(days)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Half {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    Day,
    Month,
    Half,
    Year,
}

impl FromStr for PeriodUnit {
    type Err = BackscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "d" => Ok(PeriodUnit::Day),
            "month" | "m" => Ok(PeriodUnit::Month),
            "half" | "h" | "half-year" => Ok(PeriodUnit::Half),
            "year" | "y" => Ok(PeriodUnit::Year),
            _ => Err(invalid(s, "unit must be day, month, half or year")),
        }
    }
}

/// A selectable calendar period. Ordering is chronological within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CalendarPeriod {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
    Half { year: i32, half: Half },
    Year(i32),
}

impl CalendarPeriod {
    pub fn unit(&self) -> PeriodUnit {
        match self {
            CalendarPeriod::Day(_) => PeriodUnit::Day,
            CalendarPeriod::Month { .. } => PeriodUnit::Month,
            CalendarPeriod::Half { .. } => PeriodUnit::Half,
            CalendarPeriod::Year(_) => PeriodUnit::Year,
        }
    }

    /// Period of `unit` that contains `ts`.
    pub fn containing(ts: NaiveDateTime, unit: PeriodUnit) -> Self {
        let date = ts.date();
        match unit {
            PeriodUnit::Day => CalendarPeriod::Day(date),
            PeriodUnit::Month => CalendarPeriod::Month {
                year: date.year(),
                month: date.month(),
            },
            PeriodUnit::Half => CalendarPeriod::Half {
                year: date.year(),
                half: if date.month() <= 6 { Half::First } else { Half::Second },
            },
            PeriodUnit::Year => CalendarPeriod::Year(date.year()),
        }
    }

    /// Inclusive bounds. Day ends at 23:59:59.999999; month ends one second
    /// before the next month starts; halves and years end at 23:59:59.
    pub fn window(&self) -> Result<Window, BackscanError> {
        let out_of_range = || invalid(&self.to_string(), "date out of range");
        let ymd = |y: i32, m: u32, d: u32| NaiveDate::from_ymd_opt(y, m, d).ok_or_else(out_of_range);
        let at = |date: NaiveDate, h: u32, mi: u32, s: u32| {
            date.and_hms_opt(h, mi, s).ok_or_else(out_of_range)
        };

        match *self {
            CalendarPeriod::Day(date) => {
                let end = date
                    .and_hms_micro_opt(23, 59, 59, 999_999)
                    .ok_or_else(out_of_range)?;
                Ok(Window::new(midnight(date), end))
            }
            CalendarPeriod::Month { year, month } => {
                let first = ymd(year, month, 1)?;
                let next = if month == 12 {
                    ymd(year + 1, 1, 1)?
                } else {
                    ymd(year, month + 1, 1)?
                };
                Ok(Window::new(midnight(first), midnight(next) - Duration::seconds(1)))
            }
            CalendarPeriod::Half { year, half } => {
                let (start, end) = match half {
                    Half::First => (ymd(year, 1, 1)?, ymd(year, 6, 30)?),
                    Half::Second => (ymd(year, 7, 1)?, ymd(year, 12, 31)?),
                };
                Ok(Window::new(midnight(start), at(end, 23, 59, 59)?))
            }
            CalendarPeriod::Year(year) => Ok(Window::new(
                midnight(ymd(year, 1, 1)?),
                at(ymd(year, 12, 31)?, 23, 59, 59)?,
            )),
        }
    }

    /// The preceding period of the same unit.
    fn pred(&self) -> Option<Self> {
        match *self {
            CalendarPeriod::Day(date) => date.pred_opt().map(CalendarPeriod::Day),
            CalendarPeriod::Month { year, month: 1 } => Some(CalendarPeriod::Month {
                year: year - 1,
                month: 12,
            }),
            CalendarPeriod::Month { year, month } => Some(CalendarPeriod::Month {
                year,
                month: month - 1,
            }),
            CalendarPeriod::Half {
                year,
                half: Half::Second,
            } => Some(CalendarPeriod::Half {
                year,
                half: Half::First,
            }),
            CalendarPeriod::Half {
                year,
                half: Half::First,
            } => Some(CalendarPeriod::Half {
                year: year - 1,
                half: Half::Second,
            }),
            CalendarPeriod::Year(year) => Some(CalendarPeriod::Year(year - 1)),
        }
    }
}

impl fmt::Display for CalendarPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarPeriod::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            CalendarPeriod::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            CalendarPeriod::Half {
                year,
                half: Half::First,
            } => write!(f, "{:04} H1", year),
            CalendarPeriod::Half {
                year,
                half: Half::Second,
            } => write!(f, "{:04} H2", year),
            CalendarPeriod::Year(year) => write!(f, "{:04}", year),
        }
    }
}

fn parse_year(input: &str, token: &str) -> Result<i32, BackscanError> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "year must have four digits"));
    }
    token.parse().map_err(|_| invalid(input, "bad year"))
}

impl FromStr for CalendarPeriod {
    type Err = BackscanError;

    /// Accepts `YYYY-MM-DD`, `YYYY-MM`, `YYYY H1`/`YYYY H2` (also `YYYY-H1`,
    /// `YYYY 상반기`, `YYYY 하반기`) and `YYYY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        let half_marker = [
            ("상반기", Half::First),
            ("하반기", Half::Second),
            ("H1", Half::First),
            ("H2", Half::Second),
            ("h1", Half::First),
            ("h2", Half::Second),
        ]
        .into_iter()
        .find_map(|(marker, half)| input.strip_suffix(marker).map(|rest| (rest, half)));
        if let Some((rest, half)) = half_marker {
            let year_token = rest.trim_end_matches(|c: char| c == '-' || c.is_whitespace());
            let year = parse_year(input, year_token)?;
            return Ok(CalendarPeriod::Half { year, half });
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(CalendarPeriod::Day(date));
        }

        if let Some((year_token, month_token)) = input.split_once('-') {
            let year = parse_year(input, year_token)?;
            let month: u32 = month_token
                .parse()
                .map_err(|_| invalid(input, "month is not a number"))?;
            if !(1..=12).contains(&month) {
                return Err(invalid(input, "month must be 1-12"));
            }
            return Ok(CalendarPeriod::Month { year, month });
        }

        Ok(CalendarPeriod::Year(parse_year(input, input)?))
    }
}

/// How a re-aggregation window is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSpec {
    /// Last N days up to the evaluation instant.
    Trailing { days: i64 },
    Calendar(CalendarPeriod),
}

impl WindowSpec {
    pub fn resolve(&self, now: NaiveDateTime) -> Result<Window, BackscanError> {
        match self {
            WindowSpec::Trailing { days } => Window::trailing(now, *days),
            WindowSpec::Calendar(period) => period.window(),
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSpec::Trailing { days } => write!(f, "last {} days", days),
            WindowSpec::Calendar(period) => write!(f, "{}", period),
        }
    }
}

/// Every period of `unit` between the earliest and latest parseable trade
/// timestamp, newest first. Malformed timestamps are ignored.
pub fn available_periods<'a, I>(trades: I, unit: PeriodUnit) -> Vec<CalendarPeriod>
where
    I: IntoIterator<Item = &'a TradeEvent>,
{
    let mut bounds: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for ts in trades.into_iter().filter_map(TradeEvent::parsed_timestamp) {
        bounds = Some(match bounds {
            None => (ts, ts),
            Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
        });
    }
    let Some((earliest, latest)) = bounds else {
        return Vec::new();
    };

    let first = CalendarPeriod::containing(earliest, unit);
    let mut periods = Vec::new();
    let mut cursor = Some(CalendarPeriod::containing(latest, unit));
    while let Some(period) = cursor {
        periods.push(period);
        if period <= first {
            break;
        }
        cursor = period.pred();
    }
    periods
}
