use connectors::error::{DestinationError, SourceError};
use engine_config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a transfer run stopped before exhausting its source.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to connect to the source: {0}")]
    SourceConnection(String),

    #[error("Source rejected the query: {0}")]
    Query(String),

    #[error("Failed to fetch a page after {records_yielded} records: {message}")]
    SourcePage {
        records_yielded: u64,
        message: String,
    },

    #[error("Failed to connect to the destination: {0}")]
    DestinationConnection(String),

    #[error("Batch {} does not fit the destination: {message}", .batch.map(|b| b.to_string()).unwrap_or_else(|| "-".into()))]
    SchemaMismatch { batch: Option<u64>, message: String },

    #[error("Failed to write batch {batch}{}: {message}", .row_index.map(|i| format!(" at row {i}")).unwrap_or_default())]
    Write {
        batch: u64,
        row_index: Option<usize>,
        message: String,
    },

    #[error("Failed to commit batch {batch}: {message}")]
    Commit { batch: u64, message: String },

    #[error("Transfer cancelled")]
    Cancelled,
}

/// Stable, serializable name of a [`TransferError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    SourceConnection,
    Query,
    SourcePage,
    DestinationConnection,
    SchemaMismatch,
    Write,
    Commit,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::SourceConnection => "source_connection",
            ErrorKind::Query => "query",
            ErrorKind::SourcePage => "source_page",
            ErrorKind::DestinationConnection => "destination_connection",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::Write => "write",
            ErrorKind::Commit => "commit",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error as reported in a transfer result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_yielded: Option<u64>,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Config(_) => ErrorKind::Config,
            TransferError::SourceConnection(_) => ErrorKind::SourceConnection,
            TransferError::Query(_) => ErrorKind::Query,
            TransferError::SourcePage { .. } => ErrorKind::SourcePage,
            TransferError::DestinationConnection(_) => ErrorKind::DestinationConnection,
            TransferError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            TransferError::Write { .. } => ErrorKind::Write,
            TransferError::Commit { .. } => ErrorKind::Commit,
            TransferError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Sequence number of the batch the error belongs to, if any.
    pub fn batch(&self) -> Option<u64> {
        match self {
            TransferError::SchemaMismatch { batch, .. } => *batch,
            TransferError::Write { batch, .. } | TransferError::Commit { batch, .. } => {
                Some(*batch)
            }
            _ => None,
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        let (row_index, records_yielded) = match self {
            TransferError::Write { row_index, .. } => (*row_index, None),
            TransferError::SourcePage {
                records_yielded, ..
            } => (None, Some(*records_yielded)),
            _ => (None, None),
        };
        ErrorDescriptor {
            kind: self.kind(),
            message: self.to_string(),
            batch: self.batch(),
            row_index,
            records_yielded,
        }
    }

    /// Maps an error raised while opening the source.
    pub(crate) fn from_source_open(err: SourceError) -> Self {
        match err {
            SourceError::Connection(msg) => TransferError::SourceConnection(msg),
            SourceError::Query(msg) => TransferError::Query(msg),
            other => TransferError::SourceConnection(other.to_string()),
        }
    }

    /// Maps an error raised while fetching a page.
    pub(crate) fn from_source_page(err: SourceError, records_yielded: u64) -> Self {
        let message = match err {
            SourceError::Page(msg) => msg,
            other => other.to_string(),
        };
        TransferError::SourcePage {
            records_yielded,
            message,
        }
    }

    /// Maps an error raised while writing or committing batch `batch`.
    pub(crate) fn from_destination(err: DestinationError, batch: u64) -> Self {
        match err {
            DestinationError::Connection(msg) => TransferError::DestinationConnection(msg),
            DestinationError::UnknownTable(msg) => TransferError::SchemaMismatch {
                batch: Some(batch),
                message: format!("unknown table {msg}"),
            },
            DestinationError::Write { row_index, message } => TransferError::Write {
                batch,
                row_index,
                message,
            },
            DestinationError::Commit(message) => TransferError::Commit { batch, message },
            other => TransferError::Write {
                batch,
                row_index: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for TransferError {
    fn from(err: ConfigError) -> Self {
        TransferError::Config(err.to_string())
    }
}
