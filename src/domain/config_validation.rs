//! Configuration validation.
//!
//! Every section is checked before any data is fetched, so a bad value is
//! reported against its `[section] key` instead of surfacing as a symbol
//! failure halfway through a scan. Absent keys are fine; they take defaults.

use crate::domain::error::TrendError;
use crate::domain::indicator::RsiSmoothing;
use crate::domain::signal::BandPolicy;
use crate::domain::timeframe::{Interval, Period};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrendError> {
    validate_data(config)?;
    validate_engine(config)?;
    validate_signal(config)?;
    validate_scan(config)?;
    validate_cache(config)?;
    validate_report(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TrendError {
    TrendError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), TrendError> {
    match config.get_string("data", "source").as_deref() {
        None | Some("csv") | Some("yahoo") => {}
        Some(other) => {
            return Err(invalid(
                "data",
                "source",
                format!("unknown source {other:?} (expected csv or yahoo)"),
            ));
        }
    }

    if let Some(p) = config.get_string("data", "period") {
        p.parse::<Period>()
            .map_err(|e| invalid("data", "period", e.to_string()))?;
    }
    if let Some(i) = config.get_string("data", "interval") {
        i.parse::<Interval>()
            .map_err(|e| invalid("data", "interval", e.to_string()))?;
    }

    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    match (start, end) {
        (Some(s), Some(e)) if s > e => Err(invalid(
            "data",
            "start_date",
            "start_date must not be after end_date",
        )),
        (Some(_), None) => Err(TrendError::ConfigMissing {
            section: "data".to_string(),
            key: "end_date".to_string(),
        }),
        (None, Some(_)) => Err(TrendError::ConfigMissing {
            section: "data".to_string(),
            key: "start_date".to_string(),
        }),
        _ => Ok(()),
    }
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, TrendError> {
    match config.get_string("data", key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid("data", key, format!("invalid {key} format, expected YYYY-MM-DD"))),
    }
}

fn require_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TrendError> {
    if config.get_string(section, key).is_none() {
        return Ok(());
    }
    let value = config.get_int(section, key, 0);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be a positive integer")));
    }
    Ok(())
}

fn validate_engine(config: &dyn ConfigPort) -> Result<(), TrendError> {
    for key in [
        "ema_period",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "rsi_period",
        "bollinger_period",
        "sma_period",
    ] {
        require_positive(config, "engine", key)?;
    }

    let fast = config.get_int("engine", "macd_fast", 12);
    let slow = config.get_int("engine", "macd_slow", 26);
    if fast >= slow {
        return Err(invalid(
            "engine",
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }

    if config.get_string("engine", "bollinger_stddev").is_some() {
        let k = config.get_double("engine", "bollinger_stddev", 0.0);
        if !(k > 0.0 && k.is_finite()) {
            return Err(invalid(
                "engine",
                "bollinger_stddev",
                "bollinger_stddev must be positive",
            ));
        }
    }

    if let Some(s) = config.get_string("engine", "rsi_smoothing") {
        s.parse::<RsiSmoothing>()
            .map_err(|e| invalid("engine", "rsi_smoothing", e))?;
    }
    Ok(())
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), TrendError> {
    let midline = config.get_double("signal", "rsi_midline", 50.0);
    if !(0.0..=100.0).contains(&midline) {
        return Err(invalid(
            "signal",
            "rsi_midline",
            "rsi_midline must be between 0 and 100",
        ));
    }

    let slack = config.get_double("signal", "band_slack", 0.0);
    if !(0.0..1.0).contains(&slack) {
        return Err(invalid(
            "signal",
            "band_slack",
            "band_slack must be in [0, 1)",
        ));
    }

    if let Some(p) = config.get_string("signal", "band_policy") {
        p.parse::<BandPolicy>()
            .map_err(|e| invalid("signal", "band_policy", e))?;
    }
    Ok(())
}

fn validate_scan(config: &dyn ConfigPort) -> Result<(), TrendError> {
    require_positive(config, "scan", "workers")?;
    if let Some(url) = config.get_string("scan", "sheet") {
        let on_sheets = [
            "https://docs.google.com/spreadsheets/",
            "http://docs.google.com/spreadsheets/",
        ]
        .iter()
        .any(|prefix| url.trim().starts_with(prefix));
        if !on_sheets {
            return Err(invalid(
                "scan",
                "sheet",
                format!("{url:?} is not a Google Sheets link"),
            ));
        }
    }
    Ok(())
}

fn validate_cache(config: &dyn ConfigPort) -> Result<(), TrendError> {
    if config.get_int("cache", "ttl_secs", 0) < 0 {
        return Err(invalid("cache", "ttl_secs", "ttl_secs must be non-negative"));
    }
    Ok(())
}

fn validate_report(config: &dyn ConfigPort) -> Result<(), TrendError> {
    match config.get_string("report", "format").as_deref() {
        None | Some("html") | Some("svg") | Some("csv") => Ok(()),
        Some(other) => Err(invalid(
            "report",
            "format",
            format!("unknown format {other:?} (expected html, svg or csv)"),
        )),
    }
}
