//! CSV export of the merged indicator table.

use crate::domain::engine::IndicatorTable;
use crate::domain::error::TrendError;
use crate::domain::report::ChartReport;
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

fn csv_error(e: csv::Error) -> TrendError {
    TrendError::Io(std::io::Error::other(e))
}

/// Header from [`IndicatorTable::column_names`] plus a trailing `trend`
/// column when `trends` is given (one entry per row).
pub fn write_indicator_csv<W: Write>(
    table: &IndicatorTable,
    trends: Option<&[String]>,
    writer: W,
) -> Result<(), TrendError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = table.column_names();
    if trends.is_some() {
        header.push("trend".to_string());
    }
    wtr.write_record(&header).map_err(csv_error)?;

    for (i, mut record) in table.records().enumerate() {
        if let Some(trends) = trends {
            record.push(trends.get(i).cloned().unwrap_or_default());
        }
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct CsvTableAdapter;

impl ReportPort for CsvTableAdapter {
    fn write(&self, report: &ChartReport, output_path: &Path) -> Result<(), TrendError> {
        let trends: Vec<String> = report.signals.iter().map(|s| s.trend.to_string()).collect();
        let file = File::create(output_path)?;
        write_indicator_csv(&report.table, Some(&trends), file)?;
        info!(path = %output_path.display(), rows = report.table.len(), "indicator table written");
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}
