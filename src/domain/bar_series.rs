//! Normalized bar series handed from acquisition to the engine.
//!
//! Providers return bars in whatever order and shape they like: unsorted,
//! repeated timestamps, holes where the close is missing. [`BarSeries::normalize`]
//! turns that into the form the indicator engine relies on:
//! - timestamps strictly ascending and unique (a repeated timestamp keeps the
//!   last record seen)
//! - every close finite

use crate::domain::ohlcv::OhlcvBar;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
}

impl BarSeries {
    pub fn normalize(symbol: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        let symbol = symbol.into();
        let received = bars.len();

        bars.retain(|b| b.close.is_finite());
        bars.sort_by_key(|b| b.timestamp);

        let mut normalized: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match normalized.last_mut() {
                Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
                _ => normalized.push(bar),
            }
        }

        if normalized.len() != received {
            debug!(
                symbol = %symbol,
                received,
                kept = normalized.len(),
                "dropped unusable bars during normalization"
            );
        }

        Self {
            symbol,
            bars: normalized,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
