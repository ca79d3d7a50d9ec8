//! Trend classification over complete indicator rows.
//!
//! Upward:   MACD line > threshold, RSI > midline, close at/above the upper band,
//!           close > EMA.
//! Downward: MACD line < threshold, RSI < midline, close at/below the lower band,
//!           close < EMA.
//!
//! The MACD *line* (EMA fast - EMA slow) is the momentum input everywhere; the
//! histogram is carried in the row for display only. Band comparison is
//! governed by [`BandPolicy`] and `band_slack`, so a slack of 0.02 reproduces a
//! "within 2% of the band" rule without a magic constant in the predicate.

use crate::domain::engine::{IndicatorRow, IndicatorTable};
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trend {
    Upward,
    Downward,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Upward => write!(f, "upward"),
            Trend::Downward => write!(f, "downward"),
            Trend::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandPolicy {
    /// close >= band (touching counts)
    #[default]
    Inclusive,
    /// close > band
    Strict,
}

impl FromStr for BandPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inclusive" => Ok(BandPolicy::Inclusive),
            "strict" => Ok(BandPolicy::Strict),
            other => Err(format!("unknown band policy {other:?} (expected inclusive or strict)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRules {
    pub rsi_midline: f64,
    pub macd_threshold: f64,
    pub band_policy: BandPolicy,
    /// Fractional tolerance towards the middle of the bands, in [0, 1).
    pub band_slack: f64,
}

impl Default for SignalRules {
    fn default() -> Self {
        Self {
            rsi_midline: 50.0,
            macd_threshold: 0.0,
            band_policy: BandPolicy::Inclusive,
            band_slack: 0.0,
        }
    }
}

impl SignalRules {
    fn beyond_upper(&self, close: f64, upper: f64) -> bool {
        let bound = upper * (1.0 - self.band_slack);
        match self.band_policy {
            BandPolicy::Inclusive => close >= bound,
            BandPolicy::Strict => close > bound,
        }
    }

    fn beyond_lower(&self, close: f64, lower: f64) -> bool {
        let bound = lower * (1.0 + self.band_slack);
        match self.band_policy {
            BandPolicy::Inclusive => close <= bound,
            BandPolicy::Strict => close < bound,
        }
    }

    pub fn is_upward(&self, row: &IndicatorRow) -> bool {
        let close = row.close();
        row.macd.line > self.macd_threshold
            && row.rsi > self.rsi_midline
            && self.beyond_upper(close, row.bollinger.upper)
            && close > row.ema
    }

    pub fn is_downward(&self, row: &IndicatorRow) -> bool {
        let close = row.close();
        row.macd.line < self.macd_threshold
            && row.rsi < self.rsi_midline
            && self.beyond_lower(close, row.bollinger.lower)
            && close < row.ema
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub trend: Trend,
}

pub fn classify_row(row: &IndicatorRow, rules: &SignalRules) -> Signal {
    // MACD line cannot be both above and below the threshold, so at most one
    // predicate holds.
    let trend = if rules.is_upward(row) {
        Trend::Upward
    } else if rules.is_downward(row) {
        Trend::Downward
    } else {
        Trend::Neutral
    };
    Signal {
        timestamp: row.bar.timestamp,
        close: row.close(),
        trend,
    }
}

pub fn classify_latest(table: &IndicatorTable, rules: &SignalRules) -> Option<Signal> {
    table.latest().map(|row| classify_row(row, rules))
}

pub fn classify_all(table: &IndicatorTable, rules: &SignalRules) -> Vec<Signal> {
    table.rows.iter().map(|row| classify_row(row, rules)).collect()
}

/// Rows of `table` classified as `trend`.
pub fn filter_trend<'a>(
    table: &'a IndicatorTable,
    rules: &SignalRules,
    trend: Trend,
) -> Vec<&'a IndicatorRow> {
    table
        .rows
        .iter()
        .filter(|row| classify_row(row, rules).trend == trend)
        .collect()
}
