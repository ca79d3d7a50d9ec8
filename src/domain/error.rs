//! Domain error types.

use crate::domain::universe::UniverseError;

/// Top-level error type for trendscan.
///
/// Every variant is scoped to the request or symbol that produced it; none of
/// them is meant to bring the process down.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient history for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("failed to parse {file}: {reason}")]
    ImportParse { file: String, reason: String },

    #[error("unsupported file type: {file} (expected .csv)")]
    UnsupportedFileType { file: String },

    #[error("invalid {kind} token: {token:?}")]
    InvalidToken { kind: &'static str, token: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        TrendError::MalformedInput {
            reason: reason.into(),
        }
    }

    pub fn data_source(reason: impl Into<String>) -> Self {
        TrendError::DataSource {
            reason: reason.into(),
        }
    }

    /// True for the "nothing to show" outcomes that are reported as an empty
    /// result rather than a failure.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            TrendError::NoData { .. } | TrendError::InsufficientHistory { .. }
        )
    }
}

impl From<&TrendError> for std::process::ExitCode {
    fn from(err: &TrendError) -> Self {
        let code: u8 = match err {
            TrendError::Io(_) => 1,
            TrendError::ConfigParse { .. }
            | TrendError::ConfigMissing { .. }
            | TrendError::ConfigInvalid { .. }
            | TrendError::InvalidToken { .. }
            | TrendError::Universe(_) => 2,
            TrendError::DataSource { .. } | TrendError::MalformedInput { .. } => 3,
            TrendError::ImportParse { .. } | TrendError::UnsupportedFileType { .. } => 4,
            TrendError::NoData { .. } | TrendError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
