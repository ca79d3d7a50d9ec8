//! CSV file data adapter.
//!
//! Looks for `<dir>/<SYMBOL>_<interval>.csv` first and falls back to
//! `<dir>/<SYMBOL>.csv`. Columns are positional:
//! `timestamp,open,high,low,close,volume`, with a header row. The timestamp
//! may be a plain date or a date and time.

use crate::domain::error::TrendError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::timeframe::{FetchRange, FetchRequest, Interval};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a date or date-time cell. Trailing UTC offsets such as `+05:30` or
/// `Z` are ignored; timestamps are kept in exchange-local time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let value = strip_offset(value);
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn strip_offset(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    // The offset sign can only follow the date/time separator.
    let Some(sep) = value.find(['T', ' ']) else {
        return value;
    };
    match value[sep..].find(['+', '-']) {
        Some(pos) => value[..sep + pos].trim_end(),
        None => value,
    }
}

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn candidate_paths(&self, symbol: &str, interval: Interval) -> [PathBuf; 2] {
        [
            self.base_path.join(format!("{symbol}_{interval}.csv")),
            self.base_path.join(format!("{symbol}.csv")),
        ]
    }

    fn read_bars(&self, symbol: &str, path: &Path) -> Result<Vec<OhlcvBar>, TrendError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TrendError::data_source(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| {
                TrendError::data_source(format!("{}:{line}: CSV parse error: {e}", path.display()))
            })?;

            let ts_str = record.get(0).unwrap_or_default();
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| {
                TrendError::data_source(format!(
                    "{}:{line}: invalid timestamp {ts_str:?}",
                    path.display()
                ))
            })?;

            let field = |idx: usize, name: &str| -> Result<f64, TrendError> {
                let raw = record.get(idx).ok_or_else(|| {
                    TrendError::data_source(format!("{}:{line}: missing {name} column", path.display()))
                })?;
                if raw.is_empty() {
                    return Ok(f64::NAN);
                }
                raw.parse().map_err(|e| {
                    TrendError::data_source(format!(
                        "{}:{line}: invalid {name} value {raw:?}: {e}",
                        path.display()
                    ))
                })
            };

            let volume = field(5, "volume")?;
            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                timestamp,
                open: field(1, "open")?,
                high: field(2, "high")?,
                low: field(3, "low")?,
                close: field(4, "close")?,
                volume: if volume.is_nan() { 0.0 } else { volume },
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

/// Keep the bars `range` selects. Period ranges are measured back from the
/// newest bar, so a stale file still yields its most recent window.
pub fn filter_range(bars: Vec<OhlcvBar>, range: &FetchRange) -> Vec<OhlcvBar> {
    match *range {
        FetchRange::Period(period) => {
            let Some(anchor) = bars.iter().map(|b| b.timestamp).max() else {
                return bars;
            };
            match period.start_from(anchor) {
                Some(start) => bars.into_iter().filter(|b| b.timestamp >= start).collect(),
                None => bars,
            }
        }
        FetchRange::Dates { start, end } => bars
            .into_iter()
            .filter(|b| {
                let d = b.timestamp.date();
                d >= start && d <= end
            })
            .collect(),
    }
}

impl DataPort for CsvDataAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        request: &FetchRequest,
    ) -> Result<Vec<OhlcvBar>, TrendError> {
        let Some(path) = self
            .candidate_paths(symbol, request.interval)
            .into_iter()
            .find(|p| p.is_file())
        else {
            debug!(symbol, dir = %self.base_path.display(), "no CSV file for symbol");
            return Ok(Vec::new());
        };

        let bars = self.read_bars(symbol, &path)?;
        let bars = filter_range(bars, &request.range);
        debug!(symbol, file = %path.display(), bars = bars.len(), "loaded CSV bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            TrendError::data_source(format!(
                "failed to read directory {}: {e}",
                self.base_path.display()
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| TrendError::data_source(format!("directory entry error: {e}")))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".csv") else {
                continue;
            };
            let symbol = match stem.rsplit_once('_') {
                Some((head, tail)) if tail.parse::<Interval>().is_ok() => head,
                _ => stem,
            };
            symbols.push(symbol.to_string());
        }

        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}
