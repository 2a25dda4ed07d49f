use model::{pagination::token::ResumeToken, records::record::RecordShape};
use serde::Serialize;

/// Immutable, validated configuration used throughout a transfer run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRunConfig {
    pub source_query: String,
    pub destination_table: String,
    /// At least 1.
    pub batch_size: usize,
    /// At least 1; `batch_size` unless configured.
    pub page_size: usize,
    pub record_shape: RecordShape,
    pub column_mapping: Option<Vec<String>>,
    pub resume_offset: u64,
    pub prefetch: bool,
}

impl ValidatedRunConfig {
    /// Token handed to the source at open time, if the run resumes.
    pub fn resume_token(&self) -> Option<ResumeToken> {
        (self.resume_offset > 0).then(|| ResumeToken::from_offset(self.resume_offset))
    }
}
