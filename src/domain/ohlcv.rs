//! OHLCV bar representation.

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// close >= open
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}
