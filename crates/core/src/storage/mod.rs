//! Text snapshots of an item index packed in a zip archive.

pub mod relationship;
pub mod snapshot;

pub use relationship::{RelKind, Relationship};
pub use snapshot::{ApiFileManager, BATCH_SIZE};
