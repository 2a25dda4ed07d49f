pub mod error;
pub mod replicator;
pub mod result;
pub mod source;
pub mod state;

pub use error::{ErrorDescriptor, ErrorKind, TransferError};
pub use replicator::BatchReplicator;
pub use result::{ReplicatorStatus, TransferResult, TransferStatus};
pub use state::{StateSnapshot, TransferState};
