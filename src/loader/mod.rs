//! Snapshot loading.
//!
//! - `paths`: the `clade/` working directories inside a save directory
//! - `snapshot`: JSON and binary save parsing
//! - `serialized`: Java object streams, the format of binary saves
//! - `cache`: census records written after the first load
//! - `discovery`: classifying and loading every snapshot of a directory

pub mod cache;
mod discovery;
pub mod paths;
pub mod serialized;
pub mod snapshot;

pub use discovery::{discover, load_censuses, SnapshotSource};
pub use paths::SaveDirectory;
