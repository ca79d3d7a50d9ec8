//! Core domain types and logic: bars, indicators, classification and scans.

pub mod ohlcv;
pub mod bar_series;
pub mod indicator;
pub mod engine;
pub mod signal;
pub mod timeframe;
pub mod summary;
pub mod report;
pub mod universe;
pub mod scan;
pub mod cache;
pub mod config_validation;
pub mod error;
