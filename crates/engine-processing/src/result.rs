use crate::{
    error::{ErrorDescriptor, TransferError},
    state::StateSnapshot,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a [`crate::replicator::BatchReplicator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicatorStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl ReplicatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicatorStatus::Idle => "idle",
            ReplicatorStatus::Running => "running",
            ReplicatorStatus::Completed => "completed",
            ReplicatorStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReplicatorStatus::Completed | ReplicatorStatus::Failed)
    }
}

impl fmt::Display for ReplicatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Completed,
    Failed,
}

/// Outcome of one run. `records_committed` is accurate on failure too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub status: TransferStatus,
    pub records_read: u64,
    pub records_committed: u64,
    pub batches_committed: u64,
    pub last_committed_batch: Option<u64>,
    /// Offset to resume from: the run's start offset plus `records_committed`.
    pub resume_offset: u64,
    pub error: Option<ErrorDescriptor>,
}

impl TransferResult {
    pub(crate) fn from_outcome(
        snapshot: StateSnapshot,
        start_offset: u64,
        outcome: Result<(), &TransferError>,
    ) -> Self {
        let (status, error) = match outcome {
            Ok(()) => (TransferStatus::Completed, None),
            Err(err) => (TransferStatus::Failed, Some(err.descriptor())),
        };
        TransferResult {
            status,
            records_read: snapshot.records_read,
            records_committed: snapshot.records_committed,
            batches_committed: snapshot.batches_committed,
            last_committed_batch: snapshot.last_committed_batch,
            resume_offset: start_offset + snapshot.records_committed,
            error,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransferStatus::Completed
    }

    pub fn was_cancelled(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.kind == crate::error::ErrorKind::Cancelled)
    }
}
