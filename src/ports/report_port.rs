//! Chart and table export port.

use crate::domain::error::TrendError;
use crate::domain::report::ChartReport;
use std::path::Path;

/// Writes a rendered [`ChartReport`]. Outputs are for people, not for
/// re-ingestion.
pub trait ReportPort {
    fn write(&self, report: &ChartReport, output_path: &Path) -> Result<(), TrendError>;

    /// File extension this writer produces, without the dot.
    fn extension(&self) -> &'static str;
}
