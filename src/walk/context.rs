//! Walk context: shared state, channels and handles passed between the orchestrator and workers.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use crate::utils::config::ChannelCaps;
use crate::{Entry, WalkOpts};

use super::errors::WalkError;
use super::pending::Pending;
use super::tracker::{FilesystemTracker, HardlinkTracker};

/// Counters updated by workers while the walk runs.
#[derive(Debug, Default)]
pub struct WalkCounters {
    dirs: AtomicU64,
    files: AtomicU64,
    hardlinks_skipped: AtomicU64,
    pruned: AtomicU64,
    errors: AtomicU64,
    cancel_reported: AtomicBool,
}

impl WalkCounters {
    pub fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hardlink_skip(&self) {
        self.hardlinks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// True for the first caller only; later cancelled items are dropped without a report.
    pub fn claim_cancel_report(&self) -> bool {
        !self.cancel_reported.swap(true, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> WalkStats {
        WalkStats {
            dirs: self.dirs.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            hardlinks_skipped: self.hardlinks_skipped.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Totals returned by the orchestrator thread when the walk finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories listed.
    pub dirs: u64,
    /// Files and symlinks whose size was counted.
    pub files: u64,
    /// Extra names of already counted hardlinked files.
    pub hardlinks_skipped: u64,
    /// Directories and files skipped for being on another filesystem.
    pub pruned: u64,
    /// Errors sent on the error stream.
    pub errors: u64,
}

/// State shared by every worker. The device tracker is complete before this is built.
pub struct WalkContext {
    pub opts: WalkOpts,
    pub devices: FilesystemTracker,
    pub hardlinks: HardlinkTracker,
    pub pending: Pending,
    pub counters: WalkCounters,
    pub cancel: Arc<AtomicBool>,
}

impl WalkContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Sender/receiver ends a worker needs. Cloned once per worker.
#[derive(Clone)]
pub struct WorkerChannels {
    pub work_tx: Sender<PathBuf>,
    pub work_rx: Receiver<PathBuf>,
    pub entry_tx: Sender<Entry>,
    pub error_tx: Sender<WalkError>,
    /// Never sent on; disconnects when the orchestrator drops `shutdown_tx`.
    pub shutdown_rx: Receiver<()>,
}

/// All channels for one walk. Receivers of entries/errors go to the caller, the rest stay inside.
pub struct WalkChannels {
    pub workers: WorkerChannels,
    pub shutdown_tx: Sender<()>,
    pub entry_rx: Receiver<Entry>,
    pub error_rx: Receiver<WalkError>,
}

pub fn create_walk_channels(channel_cap: usize) -> WalkChannels {
    let cap = channel_cap.max(1);
    let (work_tx, work_rx) = bounded::<PathBuf>(cap);
    let (entry_tx, entry_rx) = bounded::<Entry>(cap);
    let (error_tx, error_rx) = bounded::<WalkError>(ChannelCaps::ERRORS);
    let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
    WalkChannels {
        workers: WorkerChannels {
            work_tx,
            work_rx,
            entry_tx,
            error_tx,
            shutdown_rx,
        },
        shutdown_tx,
        entry_rx,
        error_rx,
    }
}

/// Handles returned by [`start_walk`](crate::start_walk).
///
/// Drain `entry_rx` and `error_rx` until both disconnect (use two consumers, either stream can
/// block the walk when full), then join `walk_handle` for the stats.
pub struct WalkHandles {
    pub entry_rx: Receiver<Entry>,
    pub error_rx: Receiver<WalkError>,
    pub cancel: Arc<AtomicBool>,
    /// Non-directory roots that also lie inside a walked directory root.
    pub covered_roots: Vec<PathBuf>,
    pub walk_handle: JoinHandle<WalkStats>,
}

impl WalkHandles {
    /// Request cancellation. Workers stop stat-ing and drain what is queued.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}
