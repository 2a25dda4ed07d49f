use serde::Serialize;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

#[derive(Debug, Default)]
struct InnerState {
    records_read: AtomicU64,
    batches_committed: AtomicU64,
    records_committed: AtomicU64,
    // 0 until the first commit; batch numbers start at 1.
    last_committed_batch: AtomicU64,
    write_micros: AtomicU64,
}

/// Progress counters of a transfer run. Clones share the same counters;
/// only the replicator advances them.
#[derive(Debug, Clone, Default)]
pub struct TransferState {
    inner: Arc<InnerState>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub records_read: u64,
    pub records_committed: u64,
    pub batches_committed: u64,
    pub last_committed_batch: Option<u64>,
    /// Time spent inside bulk insert and commit, summed over batches.
    pub write_time: Duration,
}

impl TransferState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let last = self.inner.last_committed_batch.load(Ordering::Acquire);
        StateSnapshot {
            records_read: self.inner.records_read.load(Ordering::Acquire),
            records_committed: self.inner.records_committed.load(Ordering::Acquire),
            batches_committed: self.inner.batches_committed.load(Ordering::Acquire),
            last_committed_batch: (last > 0).then_some(last),
            write_time: Duration::from_micros(self.inner.write_micros.load(Ordering::Acquire)),
        }
    }

    pub(crate) fn reset(&self) {
        self.inner.records_read.store(0, Ordering::Release);
        self.inner.records_committed.store(0, Ordering::Release);
        self.inner.batches_committed.store(0, Ordering::Release);
        self.inner.last_committed_batch.store(0, Ordering::Release);
        self.inner.write_micros.store(0, Ordering::Release);
    }

    pub(crate) fn add_read(&self, count: usize) {
        self.inner
            .records_read
            .fetch_add(count as u64, Ordering::AcqRel);
    }

    pub(crate) fn record_commit(&self, batch: u64, rows: usize, took: Duration) {
        self.inner
            .records_committed
            .fetch_add(rows as u64, Ordering::AcqRel);
        self.inner.batches_committed.fetch_add(1, Ordering::AcqRel);
        self.inner
            .last_committed_batch
            .store(batch, Ordering::Release);
        self.inner
            .write_micros
            .fetch_add(took.as_micros() as u64, Ordering::AcqRel);
    }
}
