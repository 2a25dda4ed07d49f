use crate::error::SourceError;
use async_trait::async_trait;
use model::{
    pagination::token::ResumeToken,
    records::{page::Page, record::RecordShape},
};

/// A paginated, read-only query service.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Record variant every page of this source carries.
    fn shape(&self) -> RecordShape;

    /// Starts a query. `resume` lets a caller continue after the last
    /// committed record of an earlier run, when the source supports it.
    async fn open(
        &self,
        query: &str,
        page_size: usize,
        resume: Option<&ResumeToken>,
    ) -> Result<Box<dyn SourceHandle>, SourceError>;
}

/// An open query result. Pages are returned in source order and the
/// sequence cannot be rewound.
#[async_trait]
pub trait SourceHandle: Send {
    /// Next page, or `None` once the result is exhausted.
    async fn next_page(&mut self) -> Result<Option<Page>, SourceError>;

    async fn close(&mut self) -> Result<(), SourceError>;
}
