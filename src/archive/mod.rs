//! Bounded, time-ordered frame archive.
//!
//! The archive keeps a rolling window of the most recent frames. Storage
//! is delegated to a [`FrameStore`] backend; capacity enforcement lives in
//! [`BoundedArchive`] so every backend evicts the same way.

mod bounded;
mod memory;
#[cfg(feature = "mongo")]
mod mongo;
mod record;
mod store;

pub use bounded::{ArchiveConfig, BoundedArchive, InsertOutcome};
pub use memory::MemoryFrameStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoFrameStore;
pub use record::{FrameRecord, TimeRange};
pub use store::{FrameStore, StoreError};
