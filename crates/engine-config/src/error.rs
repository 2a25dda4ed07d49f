use thiserror::Error;

/// Errors raised while loading or validating a transfer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read the configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse the configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("batch_size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    #[error("page_size must be at least 1, got {0}")]
    InvalidPageSize(usize),

    #[error("source_query must not be empty")]
    EmptyQuery,

    #[error("destination_table must not be empty")]
    EmptyTable,

    #[error("column_mapping must name at least one column")]
    EmptyColumnMapping,

    #[error("column_mapping names '{0}' more than once")]
    DuplicateColumn(String),

    #[error("Invalid CSV delimiter: {0:?}")]
    InvalidDelimiter(char),
}
