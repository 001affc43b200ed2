//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file looked up in the current directory (e.g. `.pardu.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Worker threads ----

/// Thread limits for the walk worker pool.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Workers per available thread. The walk is I/O bound so oversubscribing pays off.
    pub parallelism_factor: usize,
    /// Minimum worker count.
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            parallelism_factor: Self::PARALLELISM_FACTOR,
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const PARALLELISM_FACTOR: usize = 2;
    pub const FLOOR_THREADS: usize = 2;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Default pool size before FD capping.
    pub fn default_workers(&self) -> usize {
        (self.all_threads * self.parallelism_factor).max(self.floor)
    }
}

// ---- Channels ----

/// Capacities for the walk's bounded channels.
pub struct ChannelCaps;

impl ChannelCaps {
    /// Work queue and entry stream. Wide trees overflow into per-worker local stacks past this.
    pub const WORK: usize = 65_536;
    /// Error stream. Consumers drain it on their own thread so it can stay small.
    pub const ERRORS: usize = 1_024;
}

// ---- Progress ----

/// Progress counter tuning.
pub struct ProgressConsts;

impl ProgressConsts {
    /// Directories between progress counter refreshes (reduce lock contention).
    pub const UPDATE_BATCH_SIZE: usize = 256;
}
