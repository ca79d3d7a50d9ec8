//! Concrete adapter implementations for ports.

pub mod cached_data_port;
pub mod chart_svg;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod html_report_adapter;
pub mod import_adapter;
pub mod table_export;
#[cfg(feature = "http")]
pub mod yahoo_adapter;
