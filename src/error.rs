//! Error types for DataPulse

use crate::types::Platform;
use thiserror::Error;

/// Broad error category, used by callers to decide how to report a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A raw record could not be mapped into the canonical schema
    Mapping,
    /// Rate table, status table or pipeline settings are unusable
    Config,
    /// Unified collections violate a key or reference constraint
    Integrity,
    /// Reading inputs or writing outputs failed
    Io,
}

/// Main error type for DataPulse
#[derive(Error, Debug)]
pub enum DataPulseError {
    #[error("Mapping error on {platform} record {record_id}: field `{field}` {reason}")]
    Mapping {
        platform: Platform,
        record_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing currency rate for {currency} (order {order_id} on {platform})")]
    MissingCurrencyRate {
        currency: String,
        platform: Platform,
        order_id: String,
    },

    #[error("Unmapped statuses with require_complete enabled: {}", .0.join(", "))]
    UnmappedStatus(Vec<String>),

    #[error("Duplicate order key: ({order_id}, {platform})")]
    DuplicateOrder { platform: Platform, order_id: String },

    #[error("Duplicate line item key: ({line_item_id}, {platform})")]
    DuplicateLineItem {
        platform: Platform,
        line_item_id: String,
    },

    #[error("Order item {line_item_id} on {platform} references missing order {order_id}")]
    OrphanItem {
        platform: Platform,
        line_item_id: String,
        order_id: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[cfg(feature = "rusqlite-support")]
    #[error("Database error: {0}")]
    SqliteError(#[from] rusqlite::Error),
}

impl DataPulseError {
    /// Build a mapping error for a record field
    pub fn mapping(
        platform: Platform,
        record_id: impl Into<String>,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        DataPulseError::Mapping {
            platform,
            record_id: record_id.into(),
            field,
            reason: reason.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataPulseError::Mapping { .. } => ErrorKind::Mapping,
            DataPulseError::Config(_)
            | DataPulseError::MissingCurrencyRate { .. }
            | DataPulseError::UnmappedStatus(_)
            | DataPulseError::TomlError(_) => ErrorKind::Config,
            DataPulseError::DuplicateOrder { .. }
            | DataPulseError::DuplicateLineItem { .. }
            | DataPulseError::OrphanItem { .. } => ErrorKind::Integrity,
            DataPulseError::IoError(_)
            | DataPulseError::SerdeError(_)
            | DataPulseError::CsvError(_) => ErrorKind::Io,
            #[cfg(feature = "rusqlite-support")]
            DataPulseError::SqliteError(_) => ErrorKind::Io,
        }
    }

    pub fn is_integrity(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }
}

/// Result type alias for DataPulse operations
pub type Result<T> = std::result::Result<T, DataPulseError>;
