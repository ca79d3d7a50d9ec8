//! HTML report adapter implementing ReportPort.
//!
//! Renders an Askama template with the inline SVG charts, the stock detail
//! table and one classified line per indicator row.

use std::fs;
use std::path::Path;

use crate::adapters::chart_svg::{render_price_chart, render_rsi_chart};
use crate::domain::error::TrendError;
use crate::domain::report::ChartReport;
use crate::domain::signal::Trend;
use crate::ports::report_port::ReportPort;

use askama::Template;
use tracing::info;

struct SummaryLine {
    label: &'static str,
    value: String,
}

struct TrendLine {
    timestamp: String,
    close: String,
    ema: String,
    macd: String,
    rsi: String,
    upper: String,
    lower: String,
    trend: Trend,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    symbol: &'a str,
    request: String,
    row_count: usize,
    dropped: usize,
    latest_trend: String,
    price_svg: String,
    rsi_svg: String,
    summary: Vec<SummaryLine>,
    upward: usize,
    downward: usize,
    neutral: usize,
    rows: Vec<TrendLine>,
}

pub struct HtmlReportAdapter;

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, report: &ChartReport) -> Result<String, TrendError> {
        let summary = report
            .summary
            .as_ref()
            .map(|s| {
                s.rows()
                    .into_iter()
                    .map(|(label, value)| SummaryLine {
                        label,
                        value: format!("{value:.2}"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rows = report
            .table
            .rows
            .iter()
            .zip(&report.signals)
            .map(|(row, signal)| TrendLine {
                timestamp: row.bar.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                close: format!("{:.2}", row.close()),
                ema: format!("{:.2}", row.ema),
                macd: format!("{:.3}", row.macd.line),
                rsi: format!("{:.1}", row.rsi),
                upper: format!("{:.2}", row.bollinger.upper),
                lower: format!("{:.2}", row.bollinger.lower),
                trend: signal.trend,
            })
            .collect();

        let template = ReportTemplate {
            symbol: &report.symbol,
            request: report.request.to_string(),
            row_count: report.table.len(),
            dropped: report.table.dropped_rows(),
            latest_trend: report
                .latest_trend()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "none".to_string()),
            price_svg: render_price_chart(&report.symbol, &report.table.rows),
            rsi_svg: render_rsi_chart(&report.table.rows),
            summary,
            upward: report.count(Trend::Upward),
            downward: report.count(Trend::Downward),
            neutral: report.count(Trend::Neutral),
            rows,
        };

        template
            .render()
            .map_err(|e| TrendError::Io(std::io::Error::other(e.to_string())))
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for HtmlReportAdapter {
    fn write(&self, report: &ChartReport, output_path: &Path) -> Result<(), TrendError> {
        let html = self.render(report)?;
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, html)?;
        info!(path = %output_path.display(), "HTML report written");
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "html"
    }
}
