//! Batch trend scan over a symbol universe.
//!
//! Each symbol is fetched, run through the engine and classified on its own
//! worker. A failing symbol becomes a typed [`ScanFailure`] and never aborts
//! the rest of the batch. Results are bucketed and sorted by symbol so the
//! report does not depend on which worker finished first.

use crate::domain::bar_series::BarSeries;
use crate::domain::engine::{run_engine, EngineConfig, IndicatorRow};
use crate::domain::error::TrendError;
use crate::domain::signal::{classify_row, Signal, SignalRules, Trend};
use crate::domain::timeframe::FetchRequest;
use crate::domain::universe::SymbolUniverse;
use crate::ports::data_port::DataPort;
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on concurrent fetches.
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanFailureReason {
    #[error("no data")]
    NoData,

    #[error("insufficient history ({bars} bars, need {minimum})")]
    InsufficientHistory { bars: usize, minimum: usize },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("source error: {0}")]
    Source(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanFailure {
    pub symbol: String,
    pub reason: ScanFailureReason,
}

/// A classified symbol together with the row it was classified on.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSignal {
    pub symbol: String,
    pub signal: Signal,
    pub latest: IndicatorRow,
}

impl SymbolSignal {
    pub fn trend(&self) -> Trend {
        self.signal.trend
    }
}

pub type SymbolOutcome = Result<SymbolSignal, ScanFailure>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub upward: Vec<SymbolSignal>,
    pub downward: Vec<SymbolSignal>,
    pub neutral: Vec<SymbolSignal>,
    pub failed: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = SymbolOutcome>) -> Self {
        let mut report = ScanReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(hit) => match hit.trend() {
                    Trend::Upward => report.upward.push(hit),
                    Trend::Downward => report.downward.push(hit),
                    Trend::Neutral => report.neutral.push(hit),
                },
                Err(failure) => report.failed.push(failure),
            }
        }
        report.upward.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        report.downward.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        report.neutral.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        report.failed.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        report
    }

    pub fn bucket(&self, trend: Trend) -> &[SymbolSignal] {
        match trend {
            Trend::Upward => &self.upward,
            Trend::Downward => &self.downward,
            Trend::Neutral => &self.neutral,
        }
    }

    pub fn classified(&self) -> usize {
        self.upward.len() + self.downward.len() + self.neutral.len()
    }

    pub fn total(&self) -> usize {
        self.classified() + self.failed.len()
    }
}

fn failure(symbol: &str, reason: ScanFailureReason) -> ScanFailure {
    ScanFailure {
        symbol: symbol.to_string(),
        reason,
    }
}

/// Fetch, compute and classify one symbol.
pub fn scan_symbol<P>(
    data_port: &P,
    symbol: &str,
    request: &FetchRequest,
    engine: &EngineConfig,
    rules: &SignalRules,
) -> SymbolOutcome
where
    P: DataPort + ?Sized,
{
    let raw = data_port
        .fetch_bars(symbol, request)
        .map_err(|e| failure(symbol, ScanFailureReason::Source(e.to_string())))?;

    let series = BarSeries::normalize(symbol, raw);
    if series.is_empty() {
        return Err(failure(symbol, ScanFailureReason::NoData));
    }

    let table = run_engine(&series, engine).map_err(|e| {
        let reason = match e {
            TrendError::NoData { .. } => ScanFailureReason::NoData,
            TrendError::MalformedInput { reason } => ScanFailureReason::MalformedInput(reason),
            other => ScanFailureReason::Source(other.to_string()),
        };
        failure(symbol, reason)
    })?;

    let Some(latest) = table.latest() else {
        return Err(failure(
            symbol,
            ScanFailureReason::InsufficientHistory {
                bars: series.len(),
                minimum: engine.min_bars(),
            },
        ));
    };

    let signal = classify_row(latest, rules);
    debug!(symbol, trend = %signal.trend, close = signal.close, "symbol classified");
    Ok(SymbolSignal {
        symbol: symbol.to_string(),
        signal,
        latest: latest.clone(),
    })
}

/// Scan every symbol of `universe` on a bounded worker pool.
///
/// Only failure to build the pool is an error; per-symbol problems land in
/// [`ScanReport::failed`].
pub fn scan_universe<P>(
    data_port: &P,
    universe: &SymbolUniverse,
    request: &FetchRequest,
    engine: &EngineConfig,
    rules: &SignalRules,
    config: &ScanConfig,
) -> Result<ScanReport, TrendError>
where
    P: DataPort + Sync + ?Sized,
{
    let workers = config.workers.clamp(1, universe.count().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| TrendError::Io(std::io::Error::other(e)))?;

    info!(symbols = universe.count(), workers, %request, "starting scan");

    let outcomes: Vec<SymbolOutcome> = pool.install(|| {
        universe
            .symbols()
            .par_iter()
            .map(|symbol| scan_symbol(data_port, symbol, request, engine, rules))
            .collect()
    });

    for failed in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        warn!(symbol = %failed.symbol, reason = %failed.reason, "symbol skipped");
    }

    let report = ScanReport::from_outcomes(outcomes);
    info!(
        upward = report.upward.len(),
        downward = report.downward.len(),
        neutral = report.neutral.len(),
        failed = report.failed.len(),
        "scan complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashMap;

    struct StubPort {
        bars: HashMap<String, Vec<OhlcvBar>>,
        broken: Vec<String>,
    }

    impl DataPort for StubPort {
        fn fetch_bars(
            &self,
            symbol: &str,
            _request: &FetchRequest,
        ) -> Result<Vec<OhlcvBar>, TrendError> {
            if self.broken.iter().any(|s| s == symbol) {
                return Err(TrendError::data_source("connection reset"));
            }
            Ok(self.bars.get(symbol).cloned().unwrap_or_default())
        }

        fn list_symbols(&self) -> Result<Vec<String>, TrendError> {
            Ok(self.bars.keys().cloned().collect())
        }
    }

    fn bars(symbol: &str, closes: impl Iterator<Item = f64>) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        closes
            .enumerate()
            .map(|(i, close)| OhlcvBar {
                symbol: symbol.into(),
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    /// Steady drift for 59 bars, then a last bar that jumps through the band.
    fn breakout(symbol: &str, base: f64, step: f64, jump: f64) -> Vec<OhlcvBar> {
        let closes = (0..60).map(move |i| {
            let drift = base + step * i as f64;
            if i == 59 { drift + jump } else { drift }
        });
        bars(symbol, closes)
    }

    fn port() -> StubPort {
        let mut map = HashMap::new();
        map.insert("UP".to_string(), breakout("UP", 100.0, 0.5, 20.0));
        map.insert("DOWN".to_string(), breakout("DOWN", 200.0, -0.5, -20.0));
        map.insert("SHORT".to_string(), bars("SHORT", (0..10).map(|i| 50.0 + i as f64)));
        StubPort {
            bars: map,
            broken: vec!["BROKEN".to_string()],
        }
    }

    #[test]
    fn rising_symbol_is_upward() {
        let outcome = scan_symbol(
            &port(),
            "UP",
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
        )
        .unwrap();
        assert_eq!(outcome.trend(), Trend::Upward);
        assert_eq!(outcome.signal.close, 149.5);
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let err = scan_symbol(
            &port(),
            "MISSING",
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
        )
        .unwrap_err();
        assert_eq!(err.reason, ScanFailureReason::NoData);
    }

    #[test]
    fn short_history_is_reported() {
        let err = scan_symbol(
            &port(),
            "SHORT",
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.reason,
            ScanFailureReason::InsufficientHistory {
                bars: 10,
                minimum: 34
            }
        );
    }

    #[test]
    fn universe_scan_buckets_and_isolates_failures() {
        let universe = SymbolUniverse::parse("UP,MISSING,DOWN,BROKEN,SHORT").unwrap();
        let report = scan_universe(
            &port(),
            &universe,
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
            &ScanConfig { workers: 3 },
        )
        .unwrap();

        assert_eq!(report.total(), 5);
        assert_eq!(report.upward.len(), 1);
        assert_eq!(report.upward[0].symbol, "UP");
        assert_eq!(report.downward.len(), 1);
        assert_eq!(report.downward[0].symbol, "DOWN");
        let failed: Vec<&str> = report.failed.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(failed, ["BROKEN", "MISSING", "SHORT"]);
        assert!(matches!(report.failed[0].reason, ScanFailureReason::Source(_)));
    }

    #[test]
    fn buckets_are_sorted_by_symbol() {
        let mut p = port();
        p.bars.insert("AUP".into(), breakout("AUP", 10.0, 0.5, 20.0));
        let universe = SymbolUniverse::parse("UP,AUP").unwrap();
        let report = scan_universe(
            &p,
            &universe,
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
            &ScanConfig::default(),
        )
        .unwrap();
        let names: Vec<&str> = report.bucket(Trend::Upward).iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(names, ["AUP", "UP"]);
    }
}
