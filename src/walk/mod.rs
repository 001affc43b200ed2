//! Concurrent walk: orchestrator, worker pool, classification and accounting trackers.

pub mod classify;
pub mod context;
pub mod errors;
pub mod orchestrator;
pub mod pending;
pub mod tracker;
pub mod worker;

pub use classify::{Classified, EntryKind, ExtMeta, FileId, classify_path};
pub use context::{WalkHandles, WalkStats};
pub use errors::{WalkError, WalkErrorKind};
pub use orchestrator::{start_walk, start_walk_with_cancel};
pub use pending::Pending;
pub use tracker::{FilesystemTracker, HardlinkTracker};
