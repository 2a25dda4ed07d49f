use crate::file::csv::error::FileError;
use thiserror::Error;

/// Errors raised by a paginated source adapter.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached.
    #[error("Source connection failed: {0}")]
    Connection(String),

    /// The query was rejected (syntax, permissions, unknown object).
    #[error("Query rejected: {0}")]
    Query(String),

    /// A page could not be fetched (network, paging-token expiry, torn record).
    #[error("Page fetch failed: {0}")]
    Page(String),

    /// The handle was used after it was closed.
    #[error("Source handle is closed")]
    Closed,
}

/// Errors raised by a transactional destination adapter.
#[derive(Debug, Error)]
pub enum DestinationError {
    /// Could not connect with the supplied credentials.
    #[error("Destination connection failed: {0}")]
    Connection(String),

    /// The destination table is unknown or could not be described.
    #[error("Unknown destination table: {0}")]
    UnknownTable(String),

    /// The bulk insert was rejected. The whole batch is considered failed.
    #[error("Bulk insert rejected{}: {message}", .row_index.map(|i| format!(" at row {i}")).unwrap_or_default())]
    Write {
        row_index: Option<usize>,
        message: String,
    },

    /// The write succeeded but the commit did not.
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Releasing the handle failed.
    #[error("Close failed: {0}")]
    Close(String),

    /// The handle was used after it was closed.
    #[error("Destination handle is closed")]
    Closed,
}

impl DestinationError {
    pub fn write(message: impl Into<String>) -> Self {
        DestinationError::Write {
            row_index: None,
            message: message.into(),
        }
    }
}

/// Errors raised while building adapters from connection settings.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The driver cannot act in the requested role.
    #[error("Driver '{driver}' cannot be used as a {role}")]
    UnsupportedRole { driver: String, role: &'static str },

    /// File-related error.
    #[error("File error: {0}")]
    FileError(#[from] FileError),
}
