//! In-memory adapters. They back the engine's tests and `memory://` dry runs.

pub mod destination;
pub mod source;

pub use destination::{DestinationCall, DestinationFailure, MemoryDestination};
pub use source::{MemorySource, SourceFailure, SourceProbe};
