//! Everything a chart export needs for one symbol.

use crate::domain::bar_series::BarSeries;
use crate::domain::engine::IndicatorTable;
use crate::domain::signal::{classify_all, Signal, SignalRules, Trend};
use crate::domain::summary::StockSummary;
use crate::domain::timeframe::FetchRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartReport {
    pub symbol: String,
    pub request: FetchRequest,
    pub table: IndicatorTable,
    /// Computed over the whole fetched series, warm-up bars included.
    pub summary: Option<StockSummary>,
    /// One per table row.
    pub signals: Vec<Signal>,
}

impl ChartReport {
    pub fn build(
        series: &BarSeries,
        table: IndicatorTable,
        request: FetchRequest,
        rules: &SignalRules,
    ) -> Self {
        let signals = classify_all(&table, rules);
        Self {
            symbol: series.symbol().to_string(),
            request,
            summary: StockSummary::from_bars(series.bars()),
            table,
            signals,
        }
    }

    pub fn latest_trend(&self) -> Option<Trend> {
        self.signals.last().map(|s| s.trend)
    }

    pub fn count(&self, trend: Trend) -> usize {
        self.signals.iter().filter(|s| s.trend == trend).count()
    }
}
