#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
pub use trendscan::domain::ohlcv::OhlcvBar;
use trendscan::domain::error::TrendError;
use trendscan::domain::timeframe::FetchRequest;
use trendscan::ports::data_port::DataPort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _request: &FetchRequest,
    ) -> Result<Vec<OhlcvBar>, TrendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TrendError::data_source(reason.clone()));
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn day(date: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        timestamp: day(date),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// Daily bars whose close moves by `step` each day from `start_price`.
pub fn generate_bars(
    symbol: &str,
    start_date: &str,
    count: usize,
    start_price: f64,
    step: f64,
) -> Vec<OhlcvBar> {
    let start = day(start_date);
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            OhlcvBar {
                symbol: symbol.to_string(),
                timestamp: start + chrono::Duration::days(i as i64),
                open: close - step / 2.0,
                high: close.max(close - step / 2.0) + 1.0,
                low: close.min(close - step / 2.0) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// A drifting series whose final bar jumps by `jump`, closing outside the
/// Bollinger band in the direction of the drift.
pub fn breakout_bars(symbol: &str, base: f64, step: f64, jump: f64) -> Vec<OhlcvBar> {
    let mut bars = generate_bars(symbol, "2024-01-01", 60, base, step);
    if let Some(last) = bars.last_mut() {
        last.close += jump;
        last.open = last.close - jump / 2.0;
        last.high = last.close.max(last.open) + 1.0;
        last.low = last.close.min(last.open) - 1.0;
    }
    bars
}
