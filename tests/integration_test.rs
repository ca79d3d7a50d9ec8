//! Integration tests for the indicator engine, trend classification and
//! universe scan, driven through a mock data port.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use trendscan::adapters::cached_data_port::CachedDataPort;
use trendscan::adapters::csv_adapter::CsvDataAdapter;
use trendscan::domain::bar_series::BarSeries;
use trendscan::domain::cache::ManualClock;
use trendscan::domain::engine::{run_engine, EngineConfig};
use trendscan::domain::error::TrendError;
use trendscan::domain::report::ChartReport;
use trendscan::domain::scan::{scan_universe, ScanConfig, ScanFailureReason};
use trendscan::domain::signal::{classify_latest, SignalRules, Trend};
use trendscan::domain::timeframe::{FetchRequest, Interval, Period};
use trendscan::domain::universe::SymbolUniverse;
use trendscan::ports::data_port::DataPort;

mod engine_pipeline {
    use super::*;

    #[test]
    fn steadily_rising_series() {
        let port = MockDataPort::new().with_bars("INFY.NS", generate_bars("INFY.NS", "2024-01-01", 40, 100.0, 1.0));
        let bars = port.fetch_bars("INFY.NS", &FetchRequest::default()).unwrap();
        let series = BarSeries::normalize("INFY.NS", bars);
        let table = run_engine(&series, &EngineConfig::default()).unwrap();

        assert_eq!(table.len(), 7);
        assert_eq!(table.dropped_rows(), 33);
        for row in &table.rows {
            assert!((row.rsi - 100.0).abs() < 1e-9);
            assert!(row.macd.line >= 0.0);
            assert!(row.close() > row.ema);
        }
        let last = table.latest().unwrap();
        assert_eq!(last.close(), 139.0);
    }

    #[test]
    fn rows_are_complete_and_ascending() {
        let bars = generate_bars("TCS.NS", "2024-01-01", 80, 50.0, 0.25);
        let series = BarSeries::normalize("TCS.NS", bars);
        let table = run_engine(&series, &EngineConfig::default()).unwrap();

        assert_eq!(table.len(), 80 - 33);
        assert!(table.rows.windows(2).all(|w| w[0].bar.timestamp < w[1].bar.timestamp));
        for row in &table.rows {
            assert!(row.ema.is_finite());
            assert!(row.rsi.is_finite());
            assert!(row.bollinger.lower <= row.bollinger.middle);
            assert!(row.bollinger.middle <= row.bollinger.upper);
        }
    }

    #[test]
    fn duplicate_and_unsorted_bars_are_normalized() {
        let mut bars = generate_bars("HDFC.NS", "2024-01-01", 40, 100.0, 1.0);
        bars.reverse();
        bars.push(make_bar("HDFC.NS", "2024-01-05", 104.0));
        let series = BarSeries::normalize("HDFC.NS", bars);
        assert_eq!(series.len(), 40);
        let table = run_engine(&series, &EngineConfig::default()).unwrap();
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn empty_series_is_no_data() {
        let series = BarSeries::normalize("NONE", Vec::new());
        assert!(matches!(
            run_engine(&series, &EngineConfig::default()),
            Err(TrendError::NoData { .. })
        ));
    }

    #[test]
    fn breakout_classifies_upward_and_report_counts_it() {
        let bars = breakout_bars("UP", 100.0, 0.5, 20.0);
        let series = BarSeries::normalize("UP", bars);
        let table = run_engine(&series, &EngineConfig::default()).unwrap();
        let rules = SignalRules::default();

        let latest = classify_latest(&table, &rules).unwrap();
        assert_eq!(latest.trend, Trend::Upward);

        let report = ChartReport::build(&series, table, FetchRequest::default(), &rules);
        assert_eq!(report.latest_trend(), Some(Trend::Upward));
        assert!(report.count(Trend::Upward) >= 1);
        assert_eq!(report.summary.unwrap().current_price, 149.5);
    }
}

mod universe_scan {
    use super::*;

    fn port() -> MockDataPort {
        MockDataPort::new()
            .with_bars("RISE.NS", breakout_bars("RISE.NS", 100.0, 0.5, 20.0))
            .with_bars("FALL.NS", breakout_bars("FALL.NS", 200.0, -0.5, -20.0))
            .with_bars("FLAT.NS", generate_bars("FLAT.NS", "2024-01-01", 60, 75.0, 0.0))
            .with_bars("EMPTY.NS", Vec::new())
            .with_error("DOWN.NS", "HTTP 503")
    }

    #[test]
    fn buckets_and_failures() {
        let universe =
            SymbolUniverse::parse("RISE.NS,FALL.NS,FLAT.NS,EMPTY.NS,DOWN.NS,GONE.NS").unwrap();
        let report = scan_universe(
            &port(),
            &universe,
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
            &ScanConfig { workers: 3 },
        )
        .unwrap();

        assert_eq!(report.total(), 6);
        assert_eq!(report.classified(), 3);
        assert_eq!(report.bucket(Trend::Upward)[0].symbol, "RISE.NS");
        assert_eq!(report.bucket(Trend::Downward)[0].symbol, "FALL.NS");
        assert_eq!(report.bucket(Trend::Neutral)[0].symbol, "FLAT.NS");

        let failed: Vec<(&str, &ScanFailureReason)> = report
            .failed
            .iter()
            .map(|f| (f.symbol.as_str(), &f.reason))
            .collect();
        assert_eq!(failed.len(), 3);
        assert_eq!(failed[0].0, "DOWN.NS");
        assert!(matches!(failed[0].1, ScanFailureReason::Source(_)));
        assert_eq!(failed[1], ("EMPTY.NS", &ScanFailureReason::NoData));
        assert_eq!(failed[2], ("GONE.NS", &ScanFailureReason::NoData));
    }

    #[test]
    fn single_worker_matches_many_workers() {
        let universe = SymbolUniverse::parse("RISE.NS,FALL.NS,FLAT.NS").unwrap();
        let run = |workers| {
            scan_universe(
                &port(),
                &universe,
                &FetchRequest::default(),
                &EngineConfig::default(),
                &SignalRules::default(),
                &ScanConfig { workers },
            )
            .unwrap()
        };
        assert_eq!(run(1), run(20));
    }

    #[test]
    fn every_symbol_is_fetched_once() {
        let port = port();
        let universe = SymbolUniverse::parse("RISE.NS,FALL.NS,FLAT.NS,EMPTY.NS").unwrap();
        scan_universe(
            &port,
            &universe,
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
            &ScanConfig::default(),
        )
        .unwrap();
        assert_eq!(port.call_count(), 4);
    }
}

mod caching {
    use super::*;

    #[test]
    fn repeated_fetch_within_ttl_hits_cache() {
        let clock = Arc::new(ManualClock::new());
        let cached = CachedDataPort::with_clock(
            MockDataPort::new().with_bars("A", generate_bars("A", "2024-01-01", 5, 10.0, 1.0)),
            Duration::from_secs(3600),
            clock.clone(),
        );
        let request = FetchRequest::default();

        let first = cached.fetch_bars("A", &request).unwrap();
        clock.advance(Duration::from_secs(3599));
        let second = cached.fetch_bars("A", &request).unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner().call_count(), 1);

        clock.advance(Duration::from_secs(1));
        cached.fetch_bars("A", &request).unwrap();
        assert_eq!(cached.inner().call_count(), 2);
    }

    #[test]
    fn different_requests_are_cached_separately() {
        let cached = CachedDataPort::new(
            MockDataPort::new().with_bars("A", generate_bars("A", "2024-01-01", 5, 10.0, 1.0)),
            Duration::from_secs(60),
        );
        cached.fetch_bars("A", &FetchRequest::default()).unwrap();
        cached
            .fetch_bars("A", &FetchRequest::period(Period::Years(1), Interval::Weeks(1)))
            .unwrap();
        assert_eq!(cached.inner().call_count(), 2);
        assert_eq!(cached.cached_entries(), 2);
    }

    #[test]
    fn errors_are_retried() {
        let cached = CachedDataPort::new(
            MockDataPort::new().with_error("X", "timeout"),
            Duration::from_secs(60),
        );
        assert!(matches!(
            cached.fetch_bars("X", &FetchRequest::default()),
            Err(TrendError::DataSource { .. })
        ));
        assert!(cached.fetch_bars("X", &FetchRequest::default()).is_err());
        assert_eq!(cached.inner().call_count(), 2);
    }
}

mod csv_source {
    use super::*;
    use std::fs;

    fn write_csv(dir: &std::path::Path, name: &str, bars: &[OhlcvBar]) {
        let mut body = String::from("Datetime,Open,High,Low,Close,Volume\n");
        for b in bars {
            body.push_str(&format!(
                "{},{},{},{},{},{}\n",
                b.timestamp.format("%Y-%m-%d %H:%M:%S"),
                b.open,
                b.high,
                b.low,
                b.close,
                b.volume
            ));
        }
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn scan_over_csv_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "RISE.NS.csv", &breakout_bars("RISE.NS", 100.0, 0.5, 20.0));
        write_csv(dir.path(), "FALL.NS_1d.csv", &breakout_bars("FALL.NS", 200.0, -0.5, -20.0));

        let port = CsvDataAdapter::new(dir.path());
        let universe = SymbolUniverse::from_symbols(port.list_symbols().unwrap()).unwrap();
        assert_eq!(universe.symbols(), ["FALL.NS", "RISE.NS"]);

        let report = scan_universe(
            &port,
            &universe,
            &FetchRequest::default(),
            &EngineConfig::default(),
            &SignalRules::default(),
            &ScanConfig::default(),
        )
        .unwrap();
        assert_eq!(report.bucket(Trend::Upward).len(), 1);
        assert_eq!(report.bucket(Trend::Downward).len(), 1);
        assert!(report.failed.is_empty());
    }
}
