//! Period and interval tokens for acquisition requests.
//!
//! Tokens follow the usual market-data conventions: a period such as `6mo`
//! says how far back to look, an interval such as `1d` or `5m` says how wide
//! each bar is. A [`FetchRequest`] pairs a range (period token or explicit
//! dates) with an interval and doubles as the memoization key for cached
//! acquisition.

use crate::domain::error::TrendError;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Days(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

impl Period {
    /// Earliest timestamp covered when looking back from `anchor`.
    /// `None` means unbounded.
    pub fn start_from(&self, anchor: NaiveDateTime) -> Option<NaiveDateTime> {
        match *self {
            Period::Days(n) => anchor.checked_sub_signed(Duration::days(n as i64)),
            Period::Months(n) => anchor.checked_sub_months(Months::new(n)),
            Period::Years(n) => anchor.checked_sub_months(Months::new(n.saturating_mul(12))),
            Period::YearToDate => NaiveDate::from_ymd_opt(anchor.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            Period::Max => None,
        }
    }
}

impl FromStr for Period {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        let invalid = || TrendError::InvalidToken {
            kind: "period",
            token: s.to_string(),
        };
        match token.as_str() {
            "ytd" => return Ok(Period::YearToDate),
            "max" => return Ok(Period::Max),
            _ => {}
        }
        let (amount, unit) = split_token(&token).ok_or_else(invalid)?;
        match unit {
            "d" => Ok(Period::Days(amount)),
            "mo" => Ok(Period::Months(amount)),
            "y" => Ok(Period::Years(amount)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{n}d"),
            Period::Months(n) => write!(f, "{n}mo"),
            Period::Years(n) => write!(f, "{n}y"),
            Period::YearToDate => write!(f, "ytd"),
            Period::Max => write!(f, "max"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Minutes(u32),
    Hours(u32),
    Days(u32),
    Weeks(u32),
    Months(u32),
}

impl Interval {
    pub fn is_intraday(&self) -> bool {
        matches!(self, Interval::Minutes(_) | Interval::Hours(_))
    }
}

impl FromStr for Interval {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        let invalid = || TrendError::InvalidToken {
            kind: "interval",
            token: s.to_string(),
        };
        let (amount, unit) = split_token(&token).ok_or_else(invalid)?;
        match unit {
            "m" => Ok(Interval::Minutes(amount)),
            "h" => Ok(Interval::Hours(amount)),
            "d" => Ok(Interval::Days(amount)),
            "wk" => Ok(Interval::Weeks(amount)),
            "mo" => Ok(Interval::Months(amount)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Minutes(n) => write!(f, "{n}m"),
            Interval::Hours(n) => write!(f, "{n}h"),
            Interval::Days(n) => write!(f, "{n}d"),
            Interval::Weeks(n) => write!(f, "{n}wk"),
            Interval::Months(n) => write!(f, "{n}mo"),
        }
    }
}

/// "6mo" -> (6, "mo"); rejects a missing or zero amount.
fn split_token(token: &str) -> Option<(u32, &str)> {
    let digits = token.find(|c: char| !c.is_ascii_digit())?;
    let amount: u32 = token[..digits].parse().ok()?;
    (amount > 0).then_some((amount, &token[digits..]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchRange {
    Period(Period),
    Dates { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for FetchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchRange::Period(p) => write!(f, "{p}"),
            FetchRange::Dates { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub range: FetchRange,
    pub interval: Interval,
}

impl FetchRequest {
    pub fn period(period: Period, interval: Interval) -> Self {
        Self {
            range: FetchRange::Period(period),
            interval,
        }
    }

    pub fn dates(start: NaiveDate, end: NaiveDate, interval: Interval) -> Result<Self, TrendError> {
        if start > end {
            return Err(TrendError::InvalidToken {
                kind: "date range",
                token: format!("{start}..{end}"),
            });
        }
        Ok(Self {
            range: FetchRange::Dates { start, end },
            interval,
        })
    }
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self::period(Period::Months(6), Interval::Days(1))
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.range, self.interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframePreset {
    pub label: &'static str,
    pub period: Period,
    pub interval: Interval,
}

static PRESETS: [TimeframePreset; 9] = [
    TimeframePreset {
        label: "Today",
        period: Period::Days(1),
        interval: Interval::Minutes(5),
    },
    TimeframePreset {
        label: "5 Minutes",
        period: Period::Days(1),
        interval: Interval::Minutes(5),
    },
    TimeframePreset {
        label: "1 Day",
        period: Period::Days(5),
        interval: Interval::Minutes(15),
    },
    TimeframePreset {
        label: "1 Week",
        period: Period::Months(1),
        interval: Interval::Hours(1),
    },
    TimeframePreset {
        label: "1 Month",
        period: Period::Months(2),
        interval: Interval::Days(1),
    },
    TimeframePreset {
        label: "3 Months",
        period: Period::Months(3),
        interval: Interval::Days(1),
    },
    TimeframePreset {
        label: "6 Months",
        period: Period::Months(6),
        interval: Interval::Days(1),
    },
    TimeframePreset {
        label: "1 Year",
        period: Period::Years(1),
        interval: Interval::Days(1),
    },
    TimeframePreset {
        label: "5 Years",
        period: Period::Years(5),
        interval: Interval::Weeks(1),
    },
];

impl TimeframePreset {
    pub fn all() -> &'static [TimeframePreset] {
        &PRESETS
    }

    /// Case-insensitive lookup by label.
    pub fn find(label: &str) -> Option<TimeframePreset> {
        let wanted = label.trim();
        PRESETS
            .iter()
            .find(|p| p.label.eq_ignore_ascii_case(wanted))
            .copied()
    }

    pub fn request(&self) -> FetchRequest {
        FetchRequest::period(self.period, self.interval)
    }
}
