//! Domain error types.

use std::path::PathBuf;

/// Top-level error type for tradestore.
///
/// Row- and symbol-level variants (`MalformedRow`, `LookupMiss`) are normally
/// absorbed into a [`StageReport`](crate::domain::report::StageReport); the
/// remaining variants abort the stage that hit them.
#[derive(Debug, thiserror::Error)]
pub enum TradestoreError {
    #[error("data source missing: {}", path.display())]
    DataSourceMissing { path: PathBuf },

    #[error("schema invalid for {dataset}: missing columns {}", missing.join(", "))]
    SchemaInvalid {
        dataset: String,
        missing: Vec<String>,
    },

    /// Rows are skipped as `Issue::MalformedRow`; this variant only places
    /// the class in the exit-code mapping.
    #[error("malformed row {line} in {dataset}: {reason}")]
    MalformedRow {
        dataset: String,
        line: u64,
        reason: String,
    },

    /// Misses travel as `Issue::LookupMiss`; kept for the exit-code mapping.
    #[error("no data for {symbol}")]
    LookupMiss { symbol: String },

    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

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
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradestoreError {
    pub fn service_unavailable(service: &str, reason: impl Into<String>) -> Self {
        TradestoreError::ServiceUnavailable {
            service: service.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TradestoreError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Configuration-class failures: a bad config file, or a lookup service
    /// that cannot be reached at all.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TradestoreError::ConfigParse { .. }
                | TradestoreError::ConfigMissing { .. }
                | TradestoreError::ConfigInvalid { .. }
                | TradestoreError::ServiceUnavailable { .. }
        )
    }
}

impl From<&TradestoreError> for std::process::ExitCode {
    fn from(err: &TradestoreError) -> Self {
        let code: u8 = match err {
            TradestoreError::Io(_) => 1,
            TradestoreError::ConfigParse { .. }
            | TradestoreError::ConfigMissing { .. }
            | TradestoreError::ConfigInvalid { .. } => 2,
            TradestoreError::DataSourceMissing { .. }
            | TradestoreError::SchemaInvalid { .. }
            | TradestoreError::MalformedRow { .. }
            | TradestoreError::LookupMiss { .. }
            | TradestoreError::Csv(_)
            | TradestoreError::Json(_) => 3,
            TradestoreError::ServiceUnavailable { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
