#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{
    destination::{Credentials, TableSchema},
    error::SourceError,
    memory::{MemoryDestination, MemorySource},
    source::{SourceAdapter, SourceHandle},
};
use engine_config::RunConfig;
use engine_processing::{BatchReplicator, TransferResult};
use model::{
    core::value::Value,
    pagination::token::ResumeToken,
    records::{
        page::Page,
        record::{ColumnarRecord, Record, RecordShape},
    },
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const TABLE: &str = "events";

/// `(id, label)` tuples numbered from `start`.
pub fn tuples(start: i64, count: i64) -> Vec<Record> {
    (start..start + count)
        .map(|i| Record::tuple(vec![Value::Int(i), Value::from(format!("event-{i}"))]))
        .collect()
}

/// Columnar rows carrying `label` before `id`, to exercise reordering.
pub fn columnar(start: i64, count: i64) -> Vec<Record> {
    (start..start + count)
        .map(|i| {
            ColumnarRecord::new()
                .with("label", format!("event-{i}"))
                .with("id", i)
                .into()
        })
        .collect()
}

/// Splits records into pages of the given lengths.
pub fn paged(records: Vec<Record>, lengths: &[usize]) -> Vec<Vec<Record>> {
    let mut rest = records.into_iter();
    lengths
        .iter()
        .map(|&len| rest.by_ref().take(len).collect())
        .collect()
}

pub fn events_table() -> TableSchema {
    TableSchema::from_names(TABLE, &["id", "label"])
}

pub fn destination() -> MemoryDestination {
    MemoryDestination::new().with_table(events_table())
}

pub fn tuple_config() -> RunConfig {
    RunConfig::new("SELECT id, label FROM events", TABLE, RecordShape::Tuple)
}

pub fn columnar_config() -> RunConfig {
    RunConfig::new("SELECT label, id FROM events", TABLE, RecordShape::Columnar)
}

pub fn replicator(
    source: impl SourceAdapter + 'static,
    destination: &MemoryDestination,
    config: RunConfig,
) -> BatchReplicator {
    BatchReplicator::new(
        config.validate().expect("valid run config"),
        Arc::new(source),
        Arc::new(destination.clone()),
        Credentials::new("memory://"),
    )
}

pub async fn run(
    source: impl SourceAdapter + 'static,
    destination: &MemoryDestination,
    config: RunConfig,
) -> TransferResult {
    replicator(source, destination, config).run().await
}

/// Ids of the committed rows, in destination order.
pub async fn committed_ids(destination: &MemoryDestination) -> Vec<i64> {
    destination
        .committed_rows(TABLE)
        .await
        .iter()
        .map(|row| match row.get("id") {
            Some(Value::Int(id)) => *id,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

/// Wraps a source and cancels `token` when the page with zero-based index
/// `at` is served.
pub struct CancelOnPage {
    inner: MemorySource,
    token: CancellationToken,
    at: usize,
}

impl CancelOnPage {
    pub fn new(inner: MemorySource, token: CancellationToken, at: usize) -> Self {
        Self { inner, token, at }
    }
}

#[async_trait]
impl SourceAdapter for CancelOnPage {
    fn shape(&self) -> RecordShape {
        self.inner.shape()
    }

    async fn open(
        &self,
        query: &str,
        page_size: usize,
        resume: Option<&ResumeToken>,
    ) -> Result<Box<dyn SourceHandle>, SourceError> {
        let inner = self.inner.open(query, page_size, resume).await?;
        Ok(Box::new(CancelOnPageHandle {
            inner,
            token: self.token.clone(),
            at: self.at,
            served: 0,
        }))
    }
}

struct CancelOnPageHandle {
    inner: Box<dyn SourceHandle>,
    token: CancellationToken,
    at: usize,
    served: usize,
}

#[async_trait]
impl SourceHandle for CancelOnPageHandle {
    async fn next_page(&mut self) -> Result<Option<Page>, SourceError> {
        let page = self.inner.next_page().await?;
        if page.is_some() {
            if self.served == self.at {
                self.token.cancel();
            }
            self.served += 1;
        }
        Ok(page)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.inner.close().await
    }
}
