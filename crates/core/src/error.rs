//! Error types for the bias detector.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bias detector.
#[derive(Error, Debug)]
pub enum Error {
    /// Required columns could not be mapped from the CSV header.
    #[error("Missing required columns: {}", missing.join(", "))]
    Schema {
        /// Canonical names of the unmapped required columns, sorted.
        missing: Vec<String>,
    },

    /// The upload parsed but carried no data rows.
    #[error("CSV has no data rows")]
    NoDataRows,

    /// The upload exceeded the configured byte ceiling.
    #[error("Upload too large: limit is {limit_bytes} bytes")]
    UploadTooLarge {
        /// Configured ceiling in bytes.
        limit_bytes: usize,
    },

    /// Data error (invalid or missing data).
    #[error("Data error: {0}")]
    Data(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The coaching collaborator has no API key configured.
    #[error("Coach is not configured: set an API key")]
    CoachNotConfigured,

    /// CSV reader error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a schema error from the missing column names.
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut missing: Vec<String> = missing.into_iter().map(Into::into).collect();
        missing.sort();
        Error::Schema { missing }
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether this error is a schema error (surfaced verbatim, never retried).
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema { .. })
    }
}
