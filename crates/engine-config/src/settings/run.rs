use crate::{error::ConfigError, settings::validated::ValidatedRunConfig};
use model::records::record::RecordShape;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_BATCH_SIZE: usize = 5000;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Options of a single transfer run, as written by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub source_query: String,
    pub destination_table: String,

    /// Records per destination commit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Records per source fetch. Defaults to `batch_size`.
    #[serde(default)]
    pub page_size: Option<usize>,

    pub record_shape: RecordShape,

    /// Destination column order. When absent the destination is asked.
    #[serde(default)]
    pub column_mapping: Option<Vec<String>>,

    /// Records to skip at the source, usually `resume_offset` of a failed run.
    #[serde(default)]
    pub resume_offset: Option<u64>,

    /// Fetch the next page while the current batch is being written.
    #[serde(default)]
    pub prefetch: bool,
}

impl RunConfig {
    pub fn new(
        source_query: impl Into<String>,
        destination_table: impl Into<String>,
        record_shape: RecordShape,
    ) -> Self {
        RunConfig {
            source_query: source_query.into(),
            destination_table: destination_table.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: None,
            record_shape,
            column_mapping: None,
            resume_offset: None,
            prefetch: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_column_mapping<S: Into<String>>(mut self, columns: Vec<S>) -> Self {
        self.column_mapping = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_resume_offset(mut self, offset: u64) -> Self {
        self.resume_offset = Some(offset);
        self
    }

    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn validate(&self) -> Result<ValidatedRunConfig, ConfigError> {
        if self.source_query.trim().is_empty() {
            return Err(ConfigError::EmptyQuery);
        }
        if self.destination_table.trim().is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if let Some(0) = self.page_size {
            return Err(ConfigError::InvalidPageSize(0));
        }

        if let Some(columns) = &self.column_mapping {
            if columns.is_empty() {
                return Err(ConfigError::EmptyColumnMapping);
            }
            let mut seen = HashSet::with_capacity(columns.len());
            for column in columns {
                if !seen.insert(column.to_lowercase()) {
                    return Err(ConfigError::DuplicateColumn(column.clone()));
                }
            }
        }

        Ok(ValidatedRunConfig {
            source_query: self.source_query.clone(),
            destination_table: self.destination_table.clone(),
            batch_size: self.batch_size,
            page_size: self.page_size.unwrap_or(self.batch_size),
            record_shape: self.record_shape,
            column_mapping: self.column_mapping.clone(),
            resume_offset: self.resume_offset.unwrap_or(0),
            prefetch: self.prefetch,
        })
    }
}
