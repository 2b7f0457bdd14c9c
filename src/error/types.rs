//! Record store error types

use thiserror::Error;

/// Result type alias for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A required field is missing or a value has the wrong shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An update or filter named a field that is not recognized
    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Coffee roast not found: {roast_name}")]
    NotFound { roast_name: String },

    #[error("Coffee roast already exists: {roast_name}")]
    AlreadyExists { roast_name: String },

    #[error("Invalid environment: {0}. Expected: development, staging, or production")]
    InvalidEnvironment(String),

    /// The store could not be reached (timeouts, dispatch failures, throttling)
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// A stored item could not be parsed into a record
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Any other error reported by the store
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(roast_name: impl Into<String>) -> Self {
        StoreError::NotFound {
            roast_name: roast_name.into(),
        }
    }

    pub fn already_exists(roast_name: impl Into<String>) -> Self {
        StoreError::AlreadyExists {
            roast_name: roast_name.into(),
        }
    }

    /// Check if this error is worth retrying.
    ///
    /// Only connection-level failures are transient; everything else is a
    /// statement about the request or the data and will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }

    /// Check if this is a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
