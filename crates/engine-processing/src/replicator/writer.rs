use crate::{error::TransferError, replicator::reshape::RowSet};
use connectors::destination::DestinationHandle;
use model::records::batch::Batch;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub rows_written: usize,
    pub duration: Duration,
}

/// Writes one batch as a single unit of work: one bulk insert, then commit.
pub struct BatchWriter {
    table: String,
}

impl BatchWriter {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn write_batch(
        &self,
        destination: &mut dyn DestinationHandle,
        batch: &Batch,
        rows: &RowSet,
    ) -> Result<WriteResult, TransferError> {
        let start = Instant::now();

        debug!(
            batch = batch.seq,
            rows = rows.len(),
            columns = rows.columns.len(),
            checksum = batch.manifest.checksum_xxh3,
            "Writing batch"
        );

        destination
            .bulk_insert(&self.table, &rows.columns, &rows.rows)
            .await
            .map_err(|e| TransferError::from_destination(e, batch.seq))?;

        destination
            .commit()
            .await
            .map_err(|e| match TransferError::from_destination(e, batch.seq) {
                TransferError::Write { message, .. } => TransferError::Commit {
                    batch: batch.seq,
                    message,
                },
                other => other,
            })?;

        let duration = start.elapsed();
        let rows_written = rows.len();
        let rows_per_sec = rows_written as f64 / duration.as_secs_f64().max(f64::EPSILON);

        info!(
            batch = batch.seq,
            rows = rows_written,
            bytes = batch.size_bytes(),
            checksum = %format!("{:016x}", batch.manifest.checksum_xxh3),
            table = %self.table,
            duration_ms = duration.as_millis(),
            rows_per_sec = %format!("{:.2}", rows_per_sec),
            "Committed batch"
        );

        Ok(WriteResult {
            rows_written,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use connectors::{
        destination::{Cell, Credentials, DestinationAdapter},
        memory::{DestinationCall, DestinationFailure, MemoryDestination},
    };
    use model::{core::value::Value, records::record::Record};

    fn batch() -> (Batch, RowSet) {
        let batch = Batch::new(1, 0, vec![Record::tuple(vec![Value::Int(1)])]);
        let rows = RowSet {
            columns: vec!["id".into()],
            rows: vec![vec![Cell::Value(Value::Int(1))]],
        };
        (batch, rows)
    }

    #[tokio::test]
    async fn inserts_then_commits() {
        let dest = MemoryDestination::new();
        let mut handle = dest.connect(&Credentials::new("")).await.unwrap();
        let (batch, rows) = batch();

        let written = BatchWriter::new("t")
            .write_batch(handle.as_mut(), &batch, &rows)
            .await
            .unwrap();

        assert_eq!(written.rows_written, 1);
        assert_eq!(
            dest.calls().await,
            vec![
                DestinationCall::Connect,
                DestinationCall::BulkInsert {
                    table: "t".into(),
                    columns: vec!["id".into()],
                    rows: 1
                },
                DestinationCall::Commit,
            ]
        );
        assert_eq!(dest.commit_sizes().await, vec![1]);
    }

    #[tokio::test]
    async fn commit_failure_is_reported_as_commit() {
        let dest = MemoryDestination::new().with_failure(DestinationFailure::Commit {
            call: 1,
            message: "serialization failure".into(),
        });
        let mut handle = dest.connect(&Credentials::new("")).await.unwrap();
        let (batch, rows) = batch();

        let err = BatchWriter::new("t")
            .write_batch(handle.as_mut(), &batch, &rows)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Commit);
        assert!(dest.commit_sizes().await.is_empty());
    }
}
