//! Consumer side of a walk: drain both streams and turn local directory totals into per-root
//! recursive totals.

use anyhow::{Result, anyhow};
use log::debug;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;

use crate::Entry;
use crate::utils::config::ProgressConsts;
use crate::walk::{WalkError, WalkHandles, WalkStats};

/// Outcome of a fully drained walk.
#[derive(Debug)]
pub struct Summary {
    /// Rows to print, largest first: one per directory root, one per non-directory root, plus
    /// every file and symlink in show-all mode.
    pub rows: Vec<(PathBuf, u64)>,
    /// Grand total. Every byte counted once, even with overlapping roots listed in `rows`.
    pub total: u64,
    pub errors: Vec<WalkError>,
    pub stats: WalkStats,
}

/// Running per-root accumulation. Entries may arrive in any order.
#[derive(Debug)]
pub struct Totals {
    roots: Vec<PathBuf>,
    root_totals: Vec<Option<u64>>,
    /// Directories already added, so a directory reported twice only counts once.
    seen_dirs: HashSet<PathBuf>,
    /// Non-directory roots whose bytes the walk of an enclosing root also counts.
    covered: HashSet<PathBuf>,
    root_files: Vec<(PathBuf, u64)>,
    listed: Vec<(PathBuf, u64)>,
    total: u64,
    show_all: bool,
}

impl Totals {
    pub fn new<P: AsRef<Path>>(roots: &[P], show_all: bool) -> Self {
        let mut seen = HashSet::new();
        let roots: Vec<PathBuf> = roots
            .iter()
            .map(|r| r.as_ref().to_path_buf())
            .filter(|r| seen.insert(r.clone()))
            .collect();
        Self {
            root_totals: vec![None; roots.len()],
            roots,
            seen_dirs: HashSet::new(),
            covered: HashSet::new(),
            root_files: Vec::new(),
            listed: Vec::new(),
            total: 0,
            show_all,
        }
    }

    /// Mark a non-directory root as also reachable from an enclosing root. It keeps its row but
    /// stays out of the grand total once its parent directory has been reported.
    pub fn mark_covered(&mut self, root: impl Into<PathBuf>) {
        self.covered.insert(root.into());
    }

    pub fn add(&mut self, entry: Entry) {
        if entry.is_dir {
            if !self.seen_dirs.insert(entry.path.clone()) {
                debug!("{} reported twice, counted once", entry.path.display());
                return;
            }
            self.total += entry.size;
            // Component-wise prefix: `/a` owns `/a/b` but not `/ab`.
            for (root, acc) in self.roots.iter().zip(self.root_totals.iter_mut()) {
                if entry.path.starts_with(root) {
                    *acc.get_or_insert(0) += entry.size;
                }
            }
        } else if self.roots.contains(&entry.path) {
            // A covered root also arrives from the enclosing walk in show-all mode.
            if !self.root_files.iter().any(|(path, _)| *path == entry.path) {
                self.root_files.push((entry.path, entry.size));
            }
        } else if self.show_all {
            // Already part of its directory's local total.
            self.listed.push((entry.path, entry.size));
        }
    }

    /// Bytes of non-directory roots not already inside a reported directory total.
    fn root_file_bytes(&self) -> u64 {
        self.root_files
            .iter()
            .filter(|(path, _)| !self.counted_by_parent(path))
            .map(|(_, size)| size)
            .sum()
    }

    fn counted_by_parent(&self, path: &Path) -> bool {
        self.covered.contains(path)
            && path
                .parent()
                .is_some_and(|parent| self.seen_dirs.contains(parent))
    }

    pub fn total(&self) -> u64 {
        self.total + self.root_file_bytes()
    }

    /// Recursive total for `root`, or None if no directory result arrived for it.
    pub fn root_total(&self, root: &Path) -> Option<u64> {
        self.roots
            .iter()
            .position(|r| r == root)
            .and_then(|i| self.root_totals[i])
    }

    /// Rows sorted by size (descending, ties by path) and the grand total.
    pub fn finish(self) -> (Vec<(PathBuf, u64)>, u64) {
        let total = self.total();
        let mut rows: Vec<(PathBuf, u64)> = self
            .roots
            .into_iter()
            .zip(self.root_totals)
            .filter_map(|(root, acc)| acc.map(|size| (root, size)))
            .chain(self.root_files)
            .chain(self.listed)
            .collect();
        rows.par_sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        (rows, total)
    }
}

/// Drain `handles`: errors on a helper thread, entries on this one. `on_progress` receives the
/// number of directories seen since its last call.
pub fn aggregate<P: AsRef<Path>>(
    handles: WalkHandles,
    roots: &[P],
    show_all: bool,
    on_progress: Option<&dyn Fn(usize)>,
) -> Result<Summary> {
    let WalkHandles {
        entry_rx,
        error_rx,
        cancel: _,
        covered_roots,
        walk_handle,
    } = handles;

    let error_handle = thread::spawn(move || error_rx.iter().collect::<Vec<_>>());

    let mut totals = Totals::new(roots, show_all);
    for root in covered_roots {
        totals.mark_covered(root);
    }
    let mut dirs_since_report = 0_usize;
    for entry in entry_rx.iter() {
        if entry.is_dir {
            dirs_since_report += 1;
            if dirs_since_report == ProgressConsts::UPDATE_BATCH_SIZE {
                if let Some(f) = on_progress {
                    f(dirs_since_report);
                }
                dirs_since_report = 0;
            }
        }
        totals.add(entry);
    }
    if dirs_since_report > 0
        && let Some(f) = on_progress
    {
        f(dirs_since_report);
    }
    debug!("Entry stream closed");

    let errors = error_handle
        .join()
        .map_err(|_| anyhow!("error consumer thread panicked"))?;
    let stats = walk_handle
        .join()
        .map_err(|_| anyhow!("walk thread panicked"))?;

    let (rows, total) = totals.finish();
    Ok(Summary {
        rows,
        total,
        errors,
        stats,
    })
}
