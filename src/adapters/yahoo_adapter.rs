//! Yahoo Finance data adapter.
//!
//! Uses the unofficial v8 chart endpoint over a blocking client. Timestamps
//! come back as UTC epoch seconds and are shifted by the exchange's
//! `gmtoffset` so intraday bars read in exchange-local time. "Not Found" from
//! the endpoint is an empty result, not an error.

use crate::domain::error::TrendError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::timeframe::{FetchRange, FetchRequest};
use crate::ports::data_port::DataPort;
use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, TrendError> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, TrendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) trendscan")
            .build()
            .map_err(|e| TrendError::data_source(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(&self, symbol: &str, request: &FetchRequest) -> String {
        let range = match request.range {
            FetchRange::Period(period) => format!("range={period}"),
            FetchRange::Dates { start, end } => {
                let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
                // end date is inclusive
                let end_ts = (end + chrono::Duration::days(1))
                    .and_time(chrono::NaiveTime::MIN)
                    .and_utc()
                    .timestamp();
                format!("period1={start_ts}&period2={end_ts}")
            }
        };
        format!(
            "{}/{symbol}?{range}&interval={}&includePrePost=false",
            self.base_url, request.interval
        )
    }

    fn get_with_retry(&self, symbol: &str, url: &str) -> Result<String, TrendError> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    // 404 carries a JSON body with the "Not Found" error code.
                    if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
                        return resp.text().map_err(|e| {
                            TrendError::data_source(format!("failed to read response for {symbol}: {e}"))
                        });
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        warn!(symbol, %status, attempt, "retrying Yahoo request");
                        last_error = Some(TrendError::data_source(format!("HTTP {status} for {symbol}")));
                        continue;
                    }
                    return Err(TrendError::data_source(format!("HTTP {status} for {symbol}")));
                }
                Err(e) => {
                    warn!(symbol, error = %e, attempt, "Yahoo request failed");
                    last_error = Some(TrendError::data_source(format!("request failed for {symbol}: {e}")));
                }
            }
        }
        Err(last_error.unwrap_or_else(|| TrendError::data_source(format!("no response for {symbol}"))))
    }
}

/// Turn a chart API body into bars. Rows where every field is null
/// (holidays, halted sessions) are skipped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<OhlcvBar>, TrendError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        TrendError::data_source(format!("unexpected chart response for {symbol}: {e}"))
    })?;

    let Some(results) = resp.chart.result else {
        return match resp.chart.error {
            Some(err) if err.code == "Not Found" => Ok(Vec::new()),
            Some(err) => Err(TrendError::data_source(format!(
                "{}: {}",
                err.code, err.description
            ))),
            None => Ok(Vec::new()),
        };
    };
    let Some(data) = results.into_iter().next() else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };
    let Some(quote) = data.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();
    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let fields = [
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
            at(&quote.volume, i),
        ];
        if fields.iter().all(Option::is_none) {
            continue;
        }
        let timestamp = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| TrendError::data_source(format!("invalid timestamp {ts} for {symbol}")))?;
        let [open, high, low, close, volume] = fields;
        bars.push(OhlcvBar {
            symbol: symbol.to_string(),
            timestamp,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close: close.unwrap_or(f64::NAN),
            volume: volume.unwrap_or(0.0),
        });
    }
    Ok(bars)
}

impl DataPort for YahooAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        request: &FetchRequest,
    ) -> Result<Vec<OhlcvBar>, TrendError> {
        let url = self.chart_url(symbol, request);
        debug!(symbol, %url, "fetching chart");
        let body = self.get_with_retry(symbol, &url)?;
        let bars = parse_chart(symbol, &body)?;
        debug!(symbol, bars = bars.len(), "chart parsed");
        Ok(bars)
    }

    /// Yahoo has no symbol listing; the universe must come from elsewhere.
    fn list_symbols(&self) -> Result<Vec<String>, TrendError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timeframe::{Interval, Period};
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"{
      "chart": {
        "result": [{
          "meta": {"symbol": "INFY.NS", "gmtoffset": 19800},
          "timestamp": [1704166200, 1704252600, 1704339000],
          "indicators": {
            "quote": [{
              "open":   [1500.0, null, 1510.0],
              "high":   [1520.0, null, 1530.0],
              "low":    [1490.0, null, 1500.0],
              "close":  [1515.0, null, null],
              "volume": [100000, null, 90000]
            }]
          }
        }],
        "error": null
      }
    }"#;

    #[test]
    fn parses_bars_and_skips_null_rows() {
        let bars = parse_chart("INFY.NS", SAMPLE).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1515.0);
        assert_eq!(bars[0].volume, 100000.0);
        // 1704166200 = 2024-01-02 03:30 UTC, +05:30 local
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(9, 0, 0).unwrap()
        );
        // missing close stays NaN so normalization drops it
        assert!(bars[1].close.is_nan());
    }

    #[test]
    fn not_found_is_empty() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse_chart("NOPE", body).unwrap().is_empty());
    }

    #[test]
    fn other_api_error_is_data_source() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input - interval=7m is not supported"}}}"#;
        let err = parse_chart("INFY.NS", body).unwrap_err();
        assert!(matches!(err, TrendError::DataSource { ref reason } if reason.contains("Bad Request")));
    }

    #[test]
    fn garbage_body_is_data_source() {
        assert!(matches!(
            parse_chart("INFY.NS", "<html>"),
            Err(TrendError::DataSource { .. })
        ));
    }

    #[test]
    fn url_uses_range_or_dates() {
        let adapter = YahooAdapter::with_base_url("http://localhost").unwrap();
        let url = adapter.chart_url(
            "INFY.NS",
            &FetchRequest::period(Period::Months(6), Interval::Days(1)),
        );
        assert_eq!(url, "http://localhost/INFY.NS?range=6mo&interval=1d&includePrePost=false");

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let url = adapter.chart_url(
            "TCS.NS",
            &FetchRequest::dates(day, day, Interval::Weeks(1)).unwrap(),
        );
        assert!(url.contains("period1=1704067200&period2=1704153600"));
        assert!(url.ends_with("interval=1wk&includePrePost=false"));
    }
}
