//! Public and internal types for the pardu API and walk.

use std::path::PathBuf;

use crate::utils::config::{ChannelCaps, WorkerThreadLimits};

/// One accounted path emitted by the walk.
///
/// Directories carry their *local* total: the sum of their immediate regular files (and shown
/// symlinks), never their subdirectories. Recursive totals are the aggregator's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub is_dir: bool,
    pub path: PathBuf,
    pub size: u64,
    /// Device id, when the platform exposes one.
    pub dev: Option<u64>,
    /// Inode number, when the platform exposes one.
    pub ino: Option<u64>,
}

impl Entry {
    pub fn dir(path: PathBuf, size: u64, dev: Option<u64>, ino: Option<u64>) -> Self {
        Self {
            is_dir: true,
            path,
            size,
            dev,
            ino,
        }
    }

    pub fn file(path: PathBuf, size: u64, dev: Option<u64>, ino: Option<u64>) -> Self {
        Self {
            is_dir: false,
            path,
            size,
            dev,
            ino,
        }
    }
}

/// Lib options for [`start_walk`](crate::start_walk) and [`du`](crate::du).
#[derive(Clone, Debug)]
pub struct WalkOpts {
    /// Follow symbolic links (stat instead of lstat everywhere).
    pub follow_links: bool,
    /// Emit an [`Entry`] for every counted file and symlink, not just directories.
    pub show_all: bool,
    /// Only account for entries on the devices of the root directories.
    pub one_filesystem: bool,
    /// Override worker thread count. When None, derived from available parallelism and FD limit.
    pub num_threads: Option<usize>,
    /// Capacity of the work queue and the entry stream.
    pub channel_cap: usize,
}

impl Default for WalkOpts {
    fn default() -> Self {
        Self {
            follow_links: false,
            show_all: false,
            one_filesystem: false,
            num_threads: None,
            channel_cap: ChannelCaps::WORK,
        }
    }
}

impl WalkOpts {
    /// Worker count to actually use: the override, or `PARALLELISM_FACTOR` x available threads.
    pub fn worker_count(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| WorkerThreadLimits::current().default_workers())
    }
}

impl From<&Opts> for WalkOpts {
    fn from(o: &Opts) -> Self {
        WalkOpts {
            follow_links: o.follow_links,
            show_all: o.show_all,
            one_filesystem: o.one_filesystem,
            num_threads: o.num_threads,
            channel_cap: o.channel_cap,
        }
    }
}

/// How sizes are rendered by the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SizeUnit {
    #[default]
    Bytes,
    Kilo,
    Human,
}

/// Full options (CLI + config file). Use [`WalkOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    pub follow_links: bool,
    pub show_all: bool,
    pub one_filesystem: bool,
    pub num_threads: Option<usize>,
    pub channel_cap: usize,
    /// Size rendering for printed rows.
    pub unit: SizeUnit,
    /// Print a TOTAL line after the rows.
    pub total: bool,
    /// Debug logging and a progress counter on stderr.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            follow_links: false,
            show_all: false,
            one_filesystem: false,
            num_threads: None,
            channel_cap: ChannelCaps::WORK,
            unit: SizeUnit::default(),
            total: false,
            verbose: false,
        }
    }
}
