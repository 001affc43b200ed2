//! Device and hardlink trackers shared by the orchestrator and all workers.
//!
//! [`FilesystemTracker`] is filled while seeding root arguments and is read-only afterwards, so
//! workers read it through a plain `Arc` without locking. [`HardlinkTracker`] is mutated by every
//! worker and claims inodes with a single locked insert-if-absent.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::classify::FileId;

/// Allowed devices for one-filesystem mode: device id -> first root seen on it.
#[derive(Debug, Default)]
pub struct FilesystemTracker {
    enabled: bool,
    devices: HashMap<u64, PathBuf>,
}

impl FilesystemTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            devices: HashMap::new(),
        }
    }

    /// Record `id` as allowed. Idempotent; the first path registered for a device is kept.
    pub fn track_device(&mut self, id: u64, path: &Path) {
        if !self.enabled {
            return;
        }
        self.devices
            .entry(id)
            .or_insert_with(|| path.to_path_buf());
    }

    /// Always true when the mode is off or the platform gave no device id.
    pub fn is_allowed_device(&self, id: Option<u64>) -> bool {
        match id {
            Some(id) if self.enabled => self.devices.contains_key(&id),
            _ => true,
        }
    }

    /// Root path that registered `id`, if any.
    pub fn root_for(&self, id: u64) -> Option<&Path> {
        self.devices.get(&id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Inodes with link count > 1 already counted during this walk.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: Mutex<HashMap<FileId, PathBuf>>,
}

impl HardlinkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check-and-set. Returns `true` if another path already claimed `id` (skip it),
    /// `false` if this call made the claim (count it).
    pub fn try_claim_inode(&self, id: FileId, path: &Path) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match seen.entry(id) {
            MapEntry::Occupied(_) => true,
            MapEntry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                false
            }
        }
    }

    /// Path that won the claim for `id`.
    pub fn first_path(&self, id: FileId) -> Option<PathBuf> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
