//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::cached_data_port::CachedDataPort;
use crate::adapters::chart_svg::SvgReportAdapter;
use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::adapters::import_adapter::{load_table, SYMBOL_COLUMN};
use crate::adapters::table_export::CsvTableAdapter;
use crate::domain::bar_series::BarSeries;
use crate::domain::config_validation::validate_config;
use crate::domain::engine::{run_engine, EngineConfig};
use crate::domain::error::TrendError;
use crate::domain::indicator::{bollinger, RsiSmoothing};
use crate::domain::report::ChartReport;
use crate::domain::scan::{scan_universe, ScanConfig, ScanReport, SymbolSignal, DEFAULT_WORKERS};
use crate::domain::signal::{BandPolicy, SignalRules, Trend};
use crate::domain::timeframe::{FetchRequest, Interval, Period, TimeframePreset};
use crate::domain::universe::SymbolUniverse;
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "trendscan", about = "Technical-indicator trend scanner")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

/// Which slice of history to fetch. A preset overrides everything else.
#[derive(Args, Debug, Default, Clone)]
pub struct RangeArgs {
    /// Lookback token, e.g. 6mo, 1y, ytd, max
    #[arg(long)]
    pub period: Option<String>,
    /// Start date (YYYY-MM-DD); requires --end
    #[arg(long, requires = "end")]
    pub start: Option<String>,
    /// End date (YYYY-MM-DD); requires --start
    #[arg(long, requires = "start")]
    pub end: Option<String>,
    /// Bar width token, e.g. 5m, 1h, 1d, 1wk
    #[arg(long)]
    pub interval: Option<String>,
    /// Dashboard preset label, e.g. "6 Months"
    #[arg(long)]
    pub preset: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a candlestick chart with indicators for one symbol
    Chart {
        #[arg(long)]
        symbol: String,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// html, svg or csv
        #[arg(long)]
        format: Option<String>,
    },
    /// Classify the latest bar of every symbol in a universe
    Scan {
        /// Comma separated symbols
        #[arg(long, conflicts_with_all = ["universe", "sheet"])]
        symbols: Option<String>,
        /// CSV, XLS or XLSX file with a Symbol column
        #[arg(long, conflicts_with = "sheet")]
        universe: Option<PathBuf>,
        /// Public Google Sheet URL with a Symbol column
        #[arg(long)]
        sheet: Option<String>,
        /// Exchange suffix appended to bare symbols, e.g. .NS
        #[arg(long)]
        suffix: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Preview an uploaded report table and list its symbols
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// List symbols known to the configured data source
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the timeframe presets
    Presets,
}

pub fn run(cli: Cli) -> ExitCode {
    logging::init(&cli.log_level);

    let result = match cli.command {
        Command::Chart {
            symbol,
            range,
            config,
            output,
            format,
        } => run_chart(
            &symbol,
            &range,
            config.as_deref(),
            output.as_deref(),
            format.as_deref(),
        ),
        Command::Scan {
            symbols,
            universe,
            sheet,
            suffix,
            range,
            config,
            workers,
        } => run_scan(
            UniverseSource::from_args(symbols, universe, sheet),
            suffix.as_deref(),
            &range,
            config.as_deref(),
            workers,
        ),
        Command::Import { file } => run_import(&file),
        Command::ListSymbols { config } => run_list_symbols(config.as_deref()),
        Command::Presets => {
            run_presets();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate the INI file, or an empty configuration when none is
/// given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, TrendError> {
    let adapter = match path {
        Some(p) => {
            info!(path = %p.display(), "loading config");
            FileConfigAdapter::from_file(p)?
        }
        None => FileConfigAdapter::empty(),
    };
    validate_config(&adapter)?;
    Ok(adapter)
}

fn config_usize(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    usize::try_from(config.get_int(section, key, default as i64)).unwrap_or(default)
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, TrendError> {
    let defaults = EngineConfig::default();

    let rsi_smoothing = match config.get_string("engine", "rsi_smoothing") {
        Some(s) => s
            .parse::<RsiSmoothing>()
            .map_err(|reason| TrendError::ConfigInvalid {
                section: "engine".into(),
                key: "rsi_smoothing".into(),
                reason,
            })?,
        None => defaults.rsi_smoothing,
    };

    let k = config.get_double(
        "engine",
        "bollinger_stddev",
        f64::from(bollinger::DEFAULT_STDDEV_MULT_X100) / 100.0,
    );
    let sma_period = config
        .get_string("engine", "sma_period")
        .map(|_| config_usize(config, "engine", "sma_period", 0))
        .filter(|&n| n > 0);

    Ok(EngineConfig {
        ema_period: config_usize(config, "engine", "ema_period", defaults.ema_period),
        macd_fast: config_usize(config, "engine", "macd_fast", defaults.macd_fast),
        macd_slow: config_usize(config, "engine", "macd_slow", defaults.macd_slow),
        macd_signal: config_usize(config, "engine", "macd_signal", defaults.macd_signal),
        rsi_period: config_usize(config, "engine", "rsi_period", defaults.rsi_period),
        rsi_smoothing,
        bollinger_period: config_usize(
            config,
            "engine",
            "bollinger_period",
            defaults.bollinger_period,
        ),
        bollinger_stddev_mult_x100: (k * 100.0).round() as u32,
        sma_period,
    })
}

pub fn build_signal_rules(config: &dyn ConfigPort) -> Result<SignalRules, TrendError> {
    let defaults = SignalRules::default();
    let band_policy = match config.get_string("signal", "band_policy") {
        Some(s) => s
            .parse::<BandPolicy>()
            .map_err(|reason| TrendError::ConfigInvalid {
                section: "signal".into(),
                key: "band_policy".into(),
                reason,
            })?,
        None => defaults.band_policy,
    };
    Ok(SignalRules {
        rsi_midline: config.get_double("signal", "rsi_midline", defaults.rsi_midline),
        macd_threshold: config.get_double("signal", "macd_threshold", defaults.macd_threshold),
        band_policy,
        band_slack: config.get_double("signal", "band_slack", defaults.band_slack),
    })
}

pub fn build_scan_config(config: &dyn ConfigPort, workers_override: Option<usize>) -> ScanConfig {
    let workers = workers_override
        .unwrap_or_else(|| config_usize(config, "scan", "workers", DEFAULT_WORKERS))
        .max(1);
    ScanConfig { workers }
}

fn parse_date(value: &str) -> Result<NaiveDate, TrendError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| TrendError::InvalidToken {
        kind: "date",
        token: value.to_string(),
    })
}

/// Resolve the fetch range: preset, then CLI dates, then CLI period, then
/// `[data]` dates, then `[data] period`, then 6mo. The interval follows the
/// same CLI-over-config order and defaults to 1d.
pub fn build_fetch_request(
    config: &dyn ConfigPort,
    args: &RangeArgs,
) -> Result<FetchRequest, TrendError> {
    if let Some(label) = args.preset.as_deref() {
        let preset = TimeframePreset::find(label).ok_or_else(|| TrendError::InvalidToken {
            kind: "preset",
            token: label.to_string(),
        })?;
        return Ok(preset.request());
    }

    let interval: Interval = match args
        .interval
        .clone()
        .or_else(|| config.get_string("data", "interval"))
    {
        Some(token) => token.parse()?,
        None => Interval::Days(1),
    };

    if let (Some(start), Some(end)) = (&args.start, &args.end) {
        return FetchRequest::dates(parse_date(start)?, parse_date(end)?, interval);
    }
    if let Some(period) = &args.period {
        return Ok(FetchRequest::period(period.parse()?, interval));
    }
    if let (Some(start), Some(end)) = (
        config.get_string("data", "start_date"),
        config.get_string("data", "end_date"),
    ) {
        return FetchRequest::dates(parse_date(&start)?, parse_date(&end)?, interval);
    }
    let period: Period = match config.get_string("data", "period") {
        Some(token) => token.parse()?,
        None => Period::Months(6),
    };
    Ok(FetchRequest::period(period, interval))
}

/// The configured acquisition source, wrapped in a TTL cache when
/// `[cache] ttl_secs` is positive.
pub fn build_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort + Sync>, TrendError> {
    let default_source = if cfg!(feature = "http") { "yahoo" } else { "csv" };
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| default_source.to_string());

    let port: Box<dyn DataPort + Sync> = match source.as_str() {
        "csv" => {
            let dir = config
                .get_string("data", "csv_dir")
                .unwrap_or_else(|| "data".to_string());
            info!(dir = %dir, "using CSV data source");
            Box::new(CsvDataAdapter::new(dir))
        }
        #[cfg(feature = "http")]
        "yahoo" => {
            info!("using Yahoo Finance data source");
            Box::new(crate::adapters::yahoo_adapter::YahooAdapter::new()?)
        }
        other => {
            return Err(TrendError::ConfigInvalid {
                section: "data".into(),
                key: "source".into(),
                reason: format!("data source {other:?} is not available in this build"),
            });
        }
    };

    let ttl = config.get_int("cache", "ttl_secs", 0);
    if ttl > 0 {
        info!(ttl_secs = ttl, "caching acquisition results");
        return Ok(Box::new(CachedDataPort::new(
            port,
            Duration::from_secs(ttl as u64),
        )));
    }
    Ok(port)
}

fn report_adapter(format: &str) -> Result<Box<dyn ReportPort>, TrendError> {
    match format.to_lowercase().as_str() {
        "html" => Ok(Box::new(HtmlReportAdapter::new())),
        "svg" => Ok(Box::new(SvgReportAdapter)),
        "csv" => Ok(Box::new(CsvTableAdapter)),
        other => Err(TrendError::InvalidToken {
            kind: "format",
            token: other.to_string(),
        }),
    }
}

/// CLI flag, then output extension, then `[report] format`, then html.
pub fn resolve_format(
    flag: Option<&str>,
    output: Option<&Path>,
    config: &dyn ConfigPort,
) -> String {
    flag.map(str::to_string)
        .or_else(|| {
            output
                .and_then(|p| p.extension())
                .and_then(|e| e.to_str())
                .map(str::to_string)
        })
        .or_else(|| config.get_string("report", "format"))
        .unwrap_or_else(|| "html".to_string())
        .to_lowercase()
}

fn run_chart(
    symbol: &str,
    range: &RangeArgs,
    config_path: Option<&Path>,
    output: Option<&Path>,
    format: Option<&str>,
) -> Result<(), TrendError> {
    let config = load_config(config_path)?;
    let engine = build_engine_config(&config)?;
    let rules = build_signal_rules(&config)?;
    let request = build_fetch_request(&config, range)?;
    let data_port = build_data_port(&config)?;
    let writer = report_adapter(&resolve_format(format, output, &config))?;

    let symbol = symbol.trim().to_uppercase();
    info!(symbol = %symbol, %request, "fetching");
    let series = BarSeries::normalize(symbol.as_str(), data_port.fetch_bars(&symbol, &request)?);
    let table = run_engine(&series, &engine)?;
    if table.is_empty() {
        return Err(TrendError::InsufficientHistory {
            symbol,
            bars: series.len(),
            minimum: engine.min_bars(),
        });
    }

    let report = ChartReport::build(&series, table, request, &rules);

    if let Some(summary) = &report.summary {
        println!("{symbol} ({request})");
        for (label, value) in summary.rows() {
            println!("  {label:<16}{value:>12.2}");
        }
    }
    if let Some(trend) = report.latest_trend() {
        println!("  {:<16}{:>12}", "Latest trend", trend.to_string());
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{symbol}.{}", writer.extension())));
    writer.write(&report, &output)?;
    println!("Report written to: {}", output.display());
    Ok(())
}

/// Public Nifty-200 constituents sheet, scanned when nothing narrower is
/// configured and the data source cannot list its own symbols.
pub const DEFAULT_UNIVERSE_SHEET: &str =
    "https://docs.google.com/spreadsheets/d/1fiuz2q9ur6SVwWOrBxgk1ejCgEdEwCnLNBfHd1Ku7U0/edit#gid=0";

/// Where the scan universe comes from, as chosen on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum UniverseSource {
    List(String),
    File(PathBuf),
    Sheet(String),
    Default,
}

impl UniverseSource {
    pub fn from_args(
        symbols: Option<String>,
        file: Option<PathBuf>,
        sheet: Option<String>,
    ) -> Self {
        match (symbols, file, sheet) {
            (Some(list), _, _) => UniverseSource::List(list),
            (None, Some(path), _) => UniverseSource::File(path),
            (None, None, Some(url)) => UniverseSource::Sheet(url),
            (None, None, None) => UniverseSource::Default,
        }
    }
}

/// Download the `Symbol` column of a Google Sheet.
pub fn fetch_sheet_symbols(url: &str) -> Result<Vec<String>, TrendError> {
    #[cfg(feature = "http")]
    {
        crate::adapters::import_adapter::HttpSheetSource::new()?.fetch_symbols(url)
    }
    #[cfg(not(feature = "http"))]
    {
        Err(TrendError::InvalidToken {
            kind: "sheet url (http feature disabled)",
            token: url.to_string(),
        })
    }
}

/// Flags first; without flags `[scan] symbols`, then `[scan] sheet`, then the
/// data source's own listing, then [`DEFAULT_UNIVERSE_SHEET`].
pub fn resolve_universe(
    source: UniverseSource,
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    load_sheet: &dyn Fn(&str) -> Result<Vec<String>, TrendError>,
) -> Result<SymbolUniverse, TrendError> {
    let universe = match source {
        UniverseSource::List(list) => SymbolUniverse::parse(&list)?,
        UniverseSource::File(path) => {
            let table = load_table(&path)?;
            let symbols = table.column(SYMBOL_COLUMN).ok_or_else(|| TrendError::ImportParse {
                file: path.display().to_string(),
                reason: format!("no {SYMBOL_COLUMN:?} column"),
            })?;
            SymbolUniverse::from_symbols(symbols)?
        }
        UniverseSource::Sheet(url) => SymbolUniverse::from_symbols(load_sheet(&url)?)?,
        UniverseSource::Default => {
            if let Some(list) = config.get_string("scan", "symbols") {
                SymbolUniverse::parse(&list)?
            } else if let Some(url) = config.get_string("scan", "sheet") {
                info!(%url, "loading universe from configured sheet");
                SymbolUniverse::from_symbols(load_sheet(&url)?)?
            } else {
                let listed = data_port.list_symbols()?;
                if listed.is_empty() {
                    info!("data source lists no symbols; using the default universe sheet");
                    SymbolUniverse::from_symbols(load_sheet(DEFAULT_UNIVERSE_SHEET)?)?
                } else {
                    SymbolUniverse::from_symbols(listed)?
                }
            }
        }
    };
    Ok(universe)
}

fn print_bucket(title: &str, hits: &[SymbolSignal]) {
    println!("{title} ({}):", hits.len());
    for hit in hits {
        let row = &hit.latest;
        println!(
            "  {:<14} close {:>10.2}  RSI {:>5.1}  MACD {:>9.3}  EMA {:>10.2}",
            hit.symbol,
            row.close(),
            row.rsi,
            row.macd.line,
            row.ema
        );
    }
}

pub fn print_scan_report(report: &ScanReport) {
    print_bucket("Upward", report.bucket(Trend::Upward));
    print_bucket("Downward", report.bucket(Trend::Downward));
    print_bucket("Neutral", report.bucket(Trend::Neutral));
    if !report.failed.is_empty() {
        println!("Skipped ({}):", report.failed.len());
        for failure in &report.failed {
            println!("  {:<14} {}", failure.symbol, failure.reason);
        }
    }
}

fn run_scan(
    source: UniverseSource,
    suffix: Option<&str>,
    range: &RangeArgs,
    config_path: Option<&Path>,
    workers: Option<usize>,
) -> Result<(), TrendError> {
    let config = load_config(config_path)?;
    let engine = build_engine_config(&config)?;
    let rules = build_signal_rules(&config)?;
    let request = build_fetch_request(&config, range)?;
    let scan_config = build_scan_config(&config, workers);
    let data_port = build_data_port(&config)?;

    let mut universe =
        resolve_universe(source, &config, data_port.as_ref(), &fetch_sheet_symbols)?;
    if let Some(suffix) = suffix
        .map(str::to_string)
        .or_else(|| config.get_string("scan", "suffix"))
    {
        universe = universe.with_suffix(&suffix);
    }

    let report = scan_universe(
        data_port.as_ref(),
        &universe,
        &request,
        &engine,
        &rules,
        &scan_config,
    )?;
    print_scan_report(&report);

    if report.classified() == 0 {
        warn!("no symbol in the universe could be classified");
    }
    Ok(())
}

fn run_import(file: &Path) -> Result<(), TrendError> {
    let table = load_table(file)?;
    println!("{}", table.headers.join(" | "));
    for row in table.head(5) {
        println!("{}", row.join(" | "));
    }
    println!("({} rows)", table.rows.len());

    match table.column(SYMBOL_COLUMN) {
        Some(symbols) => {
            let universe = SymbolUniverse::from_symbols(&symbols)?;
            println!("\n{} symbols:", universe.count());
            for symbol in universe.symbols() {
                println!("  {symbol}");
            }
        }
        None => warn!(file = %file.display(), "no Symbol column; nothing to scan"),
    }
    Ok(())
}

fn run_list_symbols(config_path: Option<&Path>) -> Result<(), TrendError> {
    let config = load_config(config_path)?;
    let data_port = build_data_port(&config)?;
    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{symbol}");
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_presets() {
    println!("{:<12}{:>8}{:>10}", "Preset", "Period", "Interval");
    for preset in TimeframePreset::all() {
        println!(
            "{:<12}{:>8}{:>10}",
            preset.label,
            preset.period.to_string(),
            preset.interval.to_string()
        );
    }
}
