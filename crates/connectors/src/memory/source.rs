use crate::{
    error::SourceError,
    source::{SourceAdapter, SourceHandle},
};
use async_trait::async_trait;
use model::{
    pagination::token::ResumeToken,
    records::{
        page::Page,
        record::{Record, RecordShape},
    },
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::debug;

#[derive(Debug, Clone)]
enum Layout {
    /// A flat record stream, cut into pages of the size requested at open time.
    Records(Vec<Record>),
    /// Fixed page boundaries; the requested page size is ignored.
    Pages(Vec<Vec<Record>>),
}

/// Failure to inject into a [`MemorySource`].
#[derive(Debug, Clone)]
pub enum SourceFailure {
    Connect(String),
    Query(String),
    /// Fail when fetching the page with this zero-based index.
    Page { at: usize, message: String },
}

/// Counters shared between a [`MemorySource`] and the handles it opens.
#[derive(Debug, Clone, Default)]
pub struct SourceProbe {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    pages_served: Arc<AtomicUsize>,
}

impl SourceProbe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }
}

/// Paginated source over records held in memory. Resumes from offset tokens.
#[derive(Debug, Clone)]
pub struct MemorySource {
    shape: RecordShape,
    layout: Layout,
    failure: Option<SourceFailure>,
    probe: SourceProbe,
}

impl MemorySource {
    pub fn from_records(shape: RecordShape, records: Vec<Record>) -> Self {
        MemorySource {
            shape,
            layout: Layout::Records(records),
            failure: None,
            probe: SourceProbe::default(),
        }
    }

    pub fn from_pages(shape: RecordShape, pages: Vec<Vec<Record>>) -> Self {
        MemorySource {
            shape,
            layout: Layout::Pages(pages),
            failure: None,
            probe: SourceProbe::default(),
        }
    }

    pub fn with_failure(mut self, failure: SourceFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }

    fn paginate(&self, page_size: usize, offset: usize) -> VecDeque<Vec<Record>> {
        match &self.layout {
            Layout::Records(records) => records
                .iter()
                .skip(offset)
                .cloned()
                .collect::<Vec<_>>()
                .chunks(page_size.max(1))
                .map(|chunk| chunk.to_vec())
                .collect(),
            Layout::Pages(pages) => {
                let mut to_skip = offset;
                let mut out = VecDeque::with_capacity(pages.len());
                for page in pages {
                    if page.is_empty() {
                        out.push_back(Vec::new());
                    } else if to_skip >= page.len() {
                        to_skip -= page.len();
                    } else {
                        out.push_back(page[to_skip..].to_vec());
                        to_skip = 0;
                    }
                }
                out
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for MemorySource {
    fn shape(&self) -> RecordShape {
        self.shape
    }

    async fn open(
        &self,
        query: &str,
        page_size: usize,
        resume: Option<&ResumeToken>,
    ) -> Result<Box<dyn SourceHandle>, SourceError> {
        match &self.failure {
            Some(SourceFailure::Connect(msg)) => return Err(SourceError::Connection(msg.clone())),
            Some(SourceFailure::Query(msg)) => return Err(SourceError::Query(msg.clone())),
            _ => {}
        }

        let offset = match resume {
            None => 0,
            Some(token) => token.as_offset().ok_or_else(|| {
                SourceError::Query("memory source only resumes from offset tokens".into())
            })? as usize,
        };

        debug!(query, page_size, offset, "Opening memory source");
        self.probe.opened.fetch_add(1, Ordering::SeqCst);

        let fail_at = match &self.failure {
            Some(SourceFailure::Page { at, message }) => Some((*at, message.clone())),
            _ => None,
        };

        Ok(Box::new(MemorySourceHandle {
            pages: self.paginate(page_size, offset),
            page_size,
            served: 0,
            fail_at,
            closed: false,
            probe: self.probe.clone(),
        }))
    }
}

struct MemorySourceHandle {
    pages: VecDeque<Vec<Record>>,
    page_size: usize,
    served: usize,
    fail_at: Option<(usize, String)>,
    closed: bool,
    probe: SourceProbe,
}

#[async_trait]
impl SourceHandle for MemorySourceHandle {
    async fn next_page(&mut self) -> Result<Option<Page>, SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        if let Some((at, message)) = &self.fail_at
            && *at == self.served
        {
            return Err(SourceError::Page(message.clone()));
        }

        match self.pages.pop_front() {
            Some(records) => {
                self.served += 1;
                self.probe.pages_served.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Page::new(records, self.page_size)))
            }
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if !self.closed {
            self.closed = true;
            self.probe.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;

    fn records(n: i64) -> Vec<Record> {
        (0..n).map(|i| Record::tuple(vec![Value::Int(i)])).collect()
    }

    async fn drain(handle: &mut Box<dyn SourceHandle>) -> Vec<usize> {
        let mut sizes = Vec::new();
        while let Some(page) = handle.next_page().await.unwrap() {
            sizes.push(page.len());
        }
        sizes
    }

    #[tokio::test]
    async fn pages_by_requested_size() {
        let source = MemorySource::from_records(RecordShape::Tuple, records(10));
        let mut handle = source.open("q", 4, None).await.unwrap();
        assert_eq!(drain(&mut handle).await, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn resume_skips_across_fixed_pages() {
        let pages = vec![records(3), records(4), records(5)];
        let source = MemorySource::from_pages(RecordShape::Tuple, pages);
        let token = ResumeToken::from_offset(5);
        let mut handle = source.open("q", 100, Some(&token)).await.unwrap();
        assert_eq!(drain(&mut handle).await, vec![2, 5]);
    }

    #[tokio::test]
    async fn injected_page_failure() {
        let source = MemorySource::from_records(RecordShape::Tuple, records(10)).with_failure(
            SourceFailure::Page {
                at: 1,
                message: "token expired".into(),
            },
        );
        let mut handle = source.open("q", 4, None).await.unwrap();
        assert!(handle.next_page().await.unwrap().is_some());
        assert!(matches!(
            handle.next_page().await,
            Err(SourceError::Page(msg)) if msg == "token expired"
        ));
    }

    #[tokio::test]
    async fn close_is_counted_once() {
        let source = MemorySource::from_records(RecordShape::Tuple, records(1));
        let probe = source.probe();
        let mut handle = source.open("q", 4, None).await.unwrap();
        handle.close().await.unwrap();
        handle.close().await.unwrap();
        assert_eq!(probe.opened(), 1);
        assert_eq!(probe.closed(), 1);
        assert!(matches!(handle.next_page().await, Err(SourceError::Closed)));
    }
}
