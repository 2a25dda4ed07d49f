use crate::error::TransferError;
use connectors::{
    error::SourceError,
    source::{SourceAdapter, SourceHandle},
};
use model::{
    pagination::token::ResumeToken,
    records::{page::Page, record::RecordShape},
};
use tracing::debug;

/// Result of a page fetch.
#[derive(Debug)]
pub enum NextPage {
    Page(Page),
    EndOfSource,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Open,
    Exhausted,
    Failed(String),
    Closed,
}

/// A query result presented as a lazy, non-restartable sequence of pages.
///
/// Once exhausted every further fetch returns `EndOfSource`; once a fetch
/// failed every further fetch fails the same way. Continuing after a failure
/// takes a new `open` with a resume token.
pub struct PagedSource {
    handle: Box<dyn SourceHandle>,
    shape: RecordShape,
    records_yielded: u64,
    pages_yielded: u64,
    phase: Phase,
}

impl PagedSource {
    pub async fn open(
        adapter: &dyn SourceAdapter,
        query: &str,
        page_size: usize,
        resume: Option<&ResumeToken>,
        shape: RecordShape,
    ) -> Result<Self, TransferError> {
        if adapter.shape() != shape {
            return Err(TransferError::Config(format!(
                "source produces {} records but the run is configured for {shape}",
                adapter.shape()
            )));
        }

        let handle = adapter
            .open(query, page_size, resume)
            .await
            .map_err(TransferError::from_source_open)?;

        debug!(page_size, resumed = resume.is_some(), "Opened paged source");
        Ok(PagedSource {
            handle,
            shape,
            records_yielded: 0,
            pages_yielded: 0,
            phase: Phase::Open,
        })
    }

    pub async fn next_page(&mut self) -> Result<NextPage, TransferError> {
        match &self.phase {
            Phase::Open => {}
            Phase::Exhausted => return Ok(NextPage::EndOfSource),
            Phase::Failed(message) => return Err(self.page_error(message.clone())),
            Phase::Closed => return Err(self.page_error(SourceError::Closed.to_string())),
        }

        let page = match self.handle.next_page().await {
            Ok(Some(page)) => page,
            Ok(None) => {
                debug!(
                    pages = self.pages_yielded,
                    records = self.records_yielded,
                    "Source exhausted"
                );
                self.phase = Phase::Exhausted;
                return Ok(NextPage::EndOfSource);
            }
            Err(err) => {
                let err = TransferError::from_source_page(err, self.records_yielded);
                if let TransferError::SourcePage { message, .. } = &err {
                    self.phase = Phase::Failed(message.clone());
                }
                return Err(err);
            }
        };

        if let Some(idx) = page.records.iter().position(|r| r.shape() != self.shape) {
            let message = format!(
                "record {idx} of page {} is {} but the run expects {}",
                self.pages_yielded + 1,
                page.records[idx].shape(),
                self.shape
            );
            self.phase = Phase::Failed(message.clone());
            return Err(self.page_error(message));
        }

        self.pages_yielded += 1;
        self.records_yielded += page.len() as u64;
        debug!(
            page = self.pages_yielded,
            rows = page.len(),
            yielded = self.records_yielded,
            "Fetched page"
        );
        Ok(NextPage::Page(page))
    }

    pub fn records_yielded(&self) -> u64 {
        self.records_yielded
    }

    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    /// Releases the source handle. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<(), SourceError> {
        if self.phase == Phase::Closed {
            return Ok(());
        }
        self.phase = Phase::Closed;
        self.handle.close().await
    }

    fn page_error(&self, message: String) -> TransferError {
        TransferError::SourcePage {
            records_yielded: self.records_yielded,
            message,
        }
    }
}
