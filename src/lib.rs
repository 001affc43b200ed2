//! pardu: parallel disk usage with hardlink dedup and one-filesystem mode

pub mod engine;
pub mod types;
pub mod utils;
pub mod walk;

/// Re-export types for API
pub use engine::aggregate::Summary;
pub use types::*;
pub use walk::{
    WalkError, WalkErrorKind, WalkHandles, WalkStats, start_walk, start_walk_with_cancel,
};

use log::debug;
use std::path::Path;

/// Result alias used by public pardu API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Walk `roots` and aggregate the streams in one call.
///
/// Use [`start_walk`] directly to consume [`Entry`] values as they are produced.
///
/// ```ignore
/// let summary = pardu::du(&["/var/log"], &pardu::WalkOpts::default())?;
/// println!("{} bytes", summary.total);
/// ```
pub fn du<P: AsRef<Path>>(roots: &[P], opts: &WalkOpts) -> Result<Summary> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    let handles = start_walk(roots, opts)?;
    engine::aggregate::aggregate(handles, roots, opts.show_all, None)
}
