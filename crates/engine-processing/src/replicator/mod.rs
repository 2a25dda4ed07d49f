pub mod accumulator;
pub mod reshape;
pub mod writer;

use crate::{
    error::TransferError,
    replicator::{accumulator::BatchAccumulator, reshape::Reshaper, writer::BatchWriter},
    result::{ReplicatorStatus, TransferResult},
    source::{
        paged::{NextPage, PagedSource},
        prefetch::{PageFeed, spawn_prefetch},
    },
    state::TransferState,
};
use connectors::{
    destination::{Credentials, DestinationAdapter, DestinationHandle},
    source::SourceAdapter,
};
use engine_config::ValidatedRunConfig;
use model::records::batch::Batch;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Streams a paged source into a transactional destination, one committed
/// batch at a time.
///
/// Source and destination handles are acquired when `run` starts and
/// released on every way out of it. Cancellation is honoured only between
/// batches: before a page is fetched and after a batch is committed.
pub struct BatchReplicator {
    config: ValidatedRunConfig,
    source: Arc<dyn SourceAdapter>,
    destination: Arc<dyn DestinationAdapter>,
    credentials: Credentials,
    writer: BatchWriter,
    state: TransferState,
    status: ReplicatorStatus,
    cancel: CancellationToken,
}

impl BatchReplicator {
    pub fn new(
        config: ValidatedRunConfig,
        source: Arc<dyn SourceAdapter>,
        destination: Arc<dyn DestinationAdapter>,
        credentials: Credentials,
    ) -> Self {
        let writer = BatchWriter::new(config.destination_table.clone());
        BatchReplicator {
            config,
            source,
            destination,
            credentials,
            writer,
            state: TransferState::new(),
            status: ReplicatorStatus::Idle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Progress counters, readable while the run is in flight.
    pub fn state(&self) -> TransferState {
        self.state.clone()
    }

    pub fn status(&self) -> ReplicatorStatus {
        self.status
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ValidatedRunConfig {
        &self.config
    }

    /// Runs the transfer to completion or to the first error.
    pub async fn run(&mut self) -> TransferResult {
        self.state.reset();
        self.status = ReplicatorStatus::Running;

        info!(
            table = %self.config.destination_table,
            batch_size = self.config.batch_size,
            page_size = self.config.page_size,
            shape = %self.config.record_shape,
            resume_offset = self.config.resume_offset,
            prefetch = self.config.prefetch,
            "Starting transfer"
        );

        let outcome = self.execute().await;
        let snapshot = self.state.snapshot();

        match &outcome {
            Ok(()) => {
                self.status = ReplicatorStatus::Completed;
                info!(
                    records = snapshot.records_committed,
                    batches = snapshot.batches_committed,
                    write_ms = snapshot.write_time.as_millis(),
                    "Transfer completed"
                );
            }
            Err(TransferError::Cancelled) => {
                self.status = ReplicatorStatus::Failed;
                warn!(
                    records = snapshot.records_committed,
                    last_batch = ?snapshot.last_committed_batch,
                    "Transfer cancelled"
                );
            }
            Err(err) => {
                self.status = ReplicatorStatus::Failed;
                error!(
                    error = %err,
                    kind = %err.kind(),
                    records = snapshot.records_committed,
                    last_batch = ?snapshot.last_committed_batch,
                    "Transfer failed"
                );
            }
        }

        TransferResult::from_outcome(
            snapshot,
            self.config.resume_offset,
            outcome.as_ref().map(|_| ()),
        )
    }

    async fn execute(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let resume = self.config.resume_token();
        let mut source = PagedSource::open(
            self.source.as_ref(),
            &self.config.source_query,
            self.config.page_size,
            resume.as_ref(),
            self.config.record_shape,
        )
        .await?;

        let mut destination = match self.destination.connect(&self.credentials).await {
            Ok(handle) => handle,
            Err(err) => {
                close_source(&mut source).await;
                return Err(TransferError::DestinationConnection(err.to_string()));
            }
        };

        let outcome = if self.config.prefetch {
            let (rx, fetcher) = spawn_prefetch(source);
            let outcome = self
                .pump(PageFeed::Prefetched(rx), destination.as_mut())
                .await;
            match fetcher.await {
                Ok(mut source) => close_source(&mut source).await,
                Err(err) => warn!(error = %err, "Prefetch task did not return the source"),
            }
            outcome
        } else {
            let outcome = self
                .pump(PageFeed::Inline(&mut source), destination.as_mut())
                .await;
            close_source(&mut source).await;
            outcome
        };

        close_destination(destination.as_mut()).await;
        outcome
    }

    async fn pump(
        &self,
        mut feed: PageFeed<'_>,
        destination: &mut dyn DestinationHandle,
    ) -> Result<(), TransferError> {
        let mut accumulator =
            BatchAccumulator::new(self.config.batch_size, self.config.resume_offset);
        let mut reshaper = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let page = match feed.next_page().await? {
                NextPage::Page(page) => page,
                NextPage::EndOfSource => break,
            };
            self.state.add_read(page.len());
            accumulator.reserve_page(page.size_hint);

            for record in page.records {
                if let Some(batch) = accumulator.push(record) {
                    self.commit_batch(destination, &mut reshaper, batch).await?;
                    if self.cancel.is_cancelled() {
                        return Err(TransferError::Cancelled);
                    }
                }
            }
        }

        if let Some(batch) = accumulator.finish() {
            self.commit_batch(destination, &mut reshaper, batch).await?;
        }
        Ok(())
    }

    async fn commit_batch(
        &self,
        destination: &mut dyn DestinationHandle,
        reshaper: &mut Option<Reshaper>,
        batch: Batch,
    ) -> Result<(), TransferError> {
        let resolved = match reshaper.take() {
            Some(resolved) => resolved,
            None => self.resolve_reshaper(destination, batch.seq).await?,
        };
        let rows = resolved.reshape(&batch);
        *reshaper = Some(resolved);

        let rows = rows?;
        let written = self.writer.write_batch(destination, &batch, &rows).await?;
        self.state
            .record_commit(batch.seq, written.rows_written, written.duration);
        Ok(())
    }

    /// Declared column order: the configured mapping, else what the
    /// destination reports. Resolved once per run.
    async fn resolve_reshaper(
        &self,
        destination: &mut dyn DestinationHandle,
        batch: u64,
    ) -> Result<Reshaper, TransferError> {
        if let Some(columns) = &self.config.column_mapping {
            return Ok(Reshaper::from_mapping(columns));
        }

        let schema = destination
            .describe(self.writer.table())
            .await
            .map_err(|e| TransferError::from_destination(e, batch))?;
        info!(
            table = %schema.table,
            columns = ?schema.names(),
            "Resolved destination columns"
        );
        Ok(Reshaper::from_schema(schema))
    }
}

async fn close_source(source: &mut PagedSource) {
    if let Err(err) = source.close().await {
        warn!(error = %err, "Failed to close source");
    }
}

async fn close_destination(destination: &mut dyn DestinationHandle) {
    if let Err(err) = destination.close().await {
        warn!(error = %err, "Failed to close destination");
    }
}
