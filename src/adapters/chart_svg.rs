//! SVG chart rendering: candlesticks with EMA and Bollinger overlays, plus an
//! RSI panel.

use crate::domain::engine::IndicatorRow;
use crate::domain::error::TrendError;
use crate::domain::report::ChartReport;
use crate::ports::report_port::ReportPort;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

const WIDTH: f64 = 900.0;
const PRICE_HEIGHT: f64 = 420.0;
const RSI_HEIGHT: f64 = 160.0;
const PADDING: f64 = 50.0;

const BULL: &str = "#26a69a";
const BEAR: &str = "#ef5350";
const EMA_COLOR: &str = "blue";
const UPPER_COLOR: &str = "red";
const LOWER_COLOR: &str = "green";

/// Maps bar index and value into plot coordinates.
struct Frame {
    height: f64,
    min: f64,
    max: f64,
    step: f64,
}

impl Frame {
    fn new(height: f64, min: f64, max: f64, count: usize) -> Self {
        let (min, max) = if max > min {
            (min, max)
        } else {
            (min - 1.0, max + 1.0)
        };
        Self {
            height,
            min,
            max,
            step: (WIDTH - 2.0 * PADDING) / count.max(1) as f64,
        }
    }

    fn x(&self, i: usize) -> f64 {
        PADDING + (i as f64 + 0.5) * self.step
    }

    fn y(&self, value: f64) -> f64 {
        let plot = self.height - 2.0 * PADDING;
        PADDING + (self.max - value) / (self.max - self.min) * plot
    }
}

fn empty_svg(height: f64, message: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{height}" viewBox="0 0 {WIDTH} {height}"><text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="14">{message}</text></svg>"#,
        WIDTH / 2.0,
        height / 2.0
    )
}

fn polyline(frame: &Frame, values: impl Iterator<Item = f64>, color: &str, dashed: bool) -> String {
    let points: Vec<String> = values
        .enumerate()
        .map(|(i, v)| format!("{:.1},{:.1}", frame.x(i), frame.y(v)))
        .collect();
    let dash = if dashed { r#" stroke-dasharray="4 3""# } else { "" };
    format!(
        r#"<polyline fill="none" stroke="{color}" stroke-width="1.5"{dash} points="{}"/>"#,
        points.join(" ")
    )
}

fn axis_labels(svg: &mut String, frame: &Frame, rows: &[IndicatorRow], format: &str) {
    let bottom = frame.height - PADDING;
    let _ = write!(
        svg,
        r##"<line x1="{PADDING}" y1="{bottom}" x2="{}" y2="{bottom}" stroke="#999"/>"##,
        WIDTH - PADDING
    );
    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        let _ = write!(
            svg,
            r#"<text x="{PADDING}" y="{}" font-family="sans-serif" font-size="11">{}</text><text x="{}" y="{}" text-anchor="end" font-family="sans-serif" font-size="11">{}</text>"#,
            bottom + 16.0,
            first.bar.timestamp.format(format),
            WIDTH - PADDING,
            bottom + 16.0,
            last.bar.timestamp.format(format),
        );
    }
    for value in [frame.min, frame.max] {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{:.1}" text-anchor="end" font-family="sans-serif" font-size="11">{value:.2}</text>"#,
            PADDING - 4.0,
            frame.y(value) + 4.0,
        );
    }
}

/// Candlestick chart with EMA and Bollinger overlays.
pub fn render_price_chart(symbol: &str, rows: &[IndicatorRow]) -> String {
    if rows.is_empty() {
        return empty_svg(PRICE_HEIGHT, "No data available.");
    }

    let min = rows
        .iter()
        .map(|r| r.bar.low.min(r.bollinger.lower))
        .fold(f64::INFINITY, f64::min);
    let max = rows
        .iter()
        .map(|r| r.bar.high.max(r.bollinger.upper))
        .fold(f64::NEG_INFINITY, f64::max);
    let frame = Frame::new(PRICE_HEIGHT, min, max, rows.len());
    let body_width = (frame.step * 0.6).max(1.0);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{PRICE_HEIGHT}" viewBox="0 0 {WIDTH} {PRICE_HEIGHT}"><text x="{PADDING}" y="24" font-family="sans-serif" font-size="16">Candlestick Chart for {symbol}</text>"#
    );

    for (i, row) in rows.iter().enumerate() {
        let bar = &row.bar;
        let color = if bar.is_bullish() { BULL } else { BEAR };
        let x = frame.x(i);
        let top = frame.y(bar.open.max(bar.close));
        let height = (frame.y(bar.open.min(bar.close)) - top).max(1.0);
        let _ = write!(
            svg,
            r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{color}"/><rect x="{:.1}" y="{top:.1}" width="{body_width:.1}" height="{height:.1}" fill="{color}"/>"#,
            frame.y(bar.high),
            frame.y(bar.low),
            x - body_width / 2.0,
        );
    }

    svg.push_str(&polyline(&frame, rows.iter().map(|r| r.ema), EMA_COLOR, false));
    svg.push_str(&polyline(
        &frame,
        rows.iter().map(|r| r.bollinger.upper),
        UPPER_COLOR,
        true,
    ));
    svg.push_str(&polyline(
        &frame,
        rows.iter().map(|r| r.bollinger.lower),
        LOWER_COLOR,
        true,
    ));

    axis_labels(&mut svg, &frame, rows, "%Y-%m-%d %H:%M");
    svg.push_str("</svg>");
    svg
}

/// RSI line on a fixed 0..100 scale with 30/50/70 guides.
pub fn render_rsi_chart(rows: &[IndicatorRow]) -> String {
    if rows.is_empty() {
        return empty_svg(RSI_HEIGHT, "No RSI data.");
    }
    let frame = Frame::new(RSI_HEIGHT, 0.0, 100.0, rows.len());
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{RSI_HEIGHT}" viewBox="0 0 {WIDTH} {RSI_HEIGHT}">"#
    );
    for level in [30.0, 50.0, 70.0] {
        let y = frame.y(level);
        let _ = write!(
            svg,
            r##"<line x1="{PADDING}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="#bbb" stroke-dasharray="2 2"/>"##,
            WIDTH - PADDING
        );
    }
    svg.push_str(&polyline(&frame, rows.iter().map(|r| r.rsi), "purple", false));
    axis_labels(&mut svg, &frame, rows, "%Y-%m-%d");
    svg.push_str("</svg>");
    svg
}

/// Writes the bare price chart as a standalone `.svg` image.
#[derive(Debug, Default)]
pub struct SvgReportAdapter;

impl ReportPort for SvgReportAdapter {
    fn write(&self, report: &ChartReport, output_path: &Path) -> Result<(), TrendError> {
        let svg = render_price_chart(&report.symbol, &report.table.rows);
        fs::write(output_path, svg)?;
        info!(path = %output_path.display(), "chart written");
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "svg"
    }
}
