// Error types for a null/empty audit run.
//
// Per-record classification never fails; everything here is either a
// configuration problem caught before the pass starts or a structural
// fault that halts it. Faults raised during the pass carry the 1-based
// record ordinal so a run can be diagnosed without re-running it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Field list, region field or region keys are malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configured column is missing from the dataset header.
    #[error("column '{column}' not found in {path}")]
    ColumnNotFound { column: String, path: PathBuf },

    /// The dataset (or its parent directory) does not exist.
    #[error("dataset not found: {path}")]
    DatasetNotFound { path: PathBuf },

    /// The dataset exists but could not be opened.
    #[error("failed to open dataset {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The record stream failed part way through.
    #[error("failed to read record {ordinal}: {source}")]
    SourceRead {
        ordinal: u64,
        #[source]
        source: csv::Error,
    },

    /// A record's region value is not one of the registered keys.
    #[error("record {ordinal} has unregistered region value '{value}'")]
    UnknownRegion { ordinal: u64, value: String },

    /// A shard worker panicked, or partial states of different shapes were merged.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// Stable code for each fault class, used in the final log line.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            Self::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Self::SourceRead { .. } => "SOURCE_READ",
            Self::UnknownRegion { .. } => "UNKNOWN_REGION",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Ordinal of the offending record, for faults raised during the pass.
    pub fn record_ordinal(&self) -> Option<u64> {
        match self {
            Self::SourceRead { ordinal, .. } | Self::UnknownRegion { ordinal, .. } => {
                Some(*ordinal)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_region_message_has_context() {
        let err = AuditError::UnknownRegion {
            ordinal: 42,
            value: "ATLANTIS COUNTY".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("ATLANTIS COUNTY"));
        assert_eq!(err.error_code(), "UNKNOWN_REGION");
        assert_eq!(err.record_ordinal(), Some(42));
    }

    #[test]
    fn test_config_errors_have_no_ordinal() {
        let err = AuditError::InvalidConfig("empty field list".to_string());
        assert_eq!(err.record_ordinal(), None);
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
