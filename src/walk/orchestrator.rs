use anyhow::{Context, Result, bail};
use crossbeam_channel::Sender;
use log::debug;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::{self, JoinHandle};

use crate::utils::config::PackagePaths;
use crate::utils::fd_limit::determine_threads_given_fd_limit;
use crate::{Entry, WalkOpts};

use super::classify::{Classified, EntryKind, classify_path};
use super::context::{
    WalkContext, WalkCounters, WalkHandles, WalkStats, WorkerChannels, create_walk_channels,
};
use super::errors::WalkError;
use super::pending::Pending;
use super::tracker::{FilesystemTracker, HardlinkTracker};
use super::worker::{counted_size, spawn_workers};

/// Root arguments after classification. Directories go to the queue, the rest are emitted directly.
struct SeededRoots {
    dirs: Vec<PathBuf>,
    others: Vec<(PathBuf, Classified)>,
    /// Non-directory roots the walk of an enclosing directory root already counts.
    covered: Vec<(PathBuf, Classified)>,
    errors: Vec<WalkError>,
}

/// Start walking `roots`. Returns the entry and error streams plus the orchestrator handle.
///
/// Every root is classified and its device recorded before any worker is released, so workers
/// only ever see a complete device set. Per-root failures are reported on the error stream; only
/// an empty root list or failing to spawn threads is an `Err`.
pub fn start_walk<P: AsRef<Path>>(roots: &[P], opts: &WalkOpts) -> Result<WalkHandles> {
    start_walk_with_cancel(roots, opts, Arc::new(AtomicBool::new(false)))
}

/// [`start_walk`] with a cancellation flag owned by the caller, so it can be armed (or already
/// set) before the first directory is popped.
pub fn start_walk_with_cancel<P: AsRef<Path>>(
    roots: &[P],
    opts: &WalkOpts,
    cancel: Arc<AtomicBool>,
) -> Result<WalkHandles> {
    if roots.is_empty() {
        bail!("no paths to walk");
    }
    let num_threads = determine_threads_given_fd_limit(opts.worker_count());
    if num_threads == 0 {
        bail!("worker count must be at least 1");
    }
    debug!(
        "Walking {} root(s) with {} workers (follow_links={}, show_all={}, one_filesystem={})",
        roots.len(),
        num_threads,
        opts.follow_links,
        opts.show_all,
        opts.one_filesystem
    );

    let mut devices = FilesystemTracker::new(opts.one_filesystem);
    let mut seeded = seed_roots(roots, opts.follow_links, &mut devices);
    drop_nested_roots(&mut seeded, opts.show_all);
    if opts.one_filesystem {
        if devices.is_empty() {
            debug!("No device ids available, one-filesystem mode has no effect");
        } else {
            debug!("Staying on {} filesystem(s)", devices.len());
        }
    }

    let ctx = Arc::new(WalkContext {
        opts: opts.clone(),
        devices,
        hardlinks: HardlinkTracker::new(),
        pending: Pending::new(),
        counters: WalkCounters::default(),
        cancel,
    });

    let covered_roots: Vec<PathBuf> = seeded.covered.iter().map(|(p, _)| p.clone()).collect();
    let root_entries: Vec<Entry> = seeded
        .others
        .into_iter()
        .filter_map(|(path, meta)| {
            counted_size(&ctx, &path, &meta)
                .map(|size| Entry::file(path, size, meta.ext.dev, meta.ext.ino))
        })
        // Listed with their own size; the enclosing walk claims the inode and counts the bytes.
        .chain(
            seeded
                .covered
                .into_iter()
                .map(|(path, meta)| Entry::file(path, meta.size, meta.ext.dev, meta.ext.ino)),
        )
        .collect();

    let channels = create_walk_channels(opts.channel_cap);
    ctx.pending.add(seeded.dirs.len());
    let workers = spawn_workers(&ctx, &channels.workers, num_threads)?;

    let cancel = Arc::clone(&ctx.cancel);
    let chans = channels.workers;
    let shutdown_tx = channels.shutdown_tx;
    let walk_handle = thread::Builder::new()
        .name(format!("{}-walk", PackagePaths::get().pkg_name()))
        .spawn(move || {
            run_walk(
                &ctx,
                &chans,
                seeded.dirs,
                root_entries,
                seeded.errors,
                shutdown_tx,
                workers,
            )
        })
        .context("spawn walk orchestrator thread")?;

    Ok(WalkHandles {
        entry_rx: channels.entry_rx,
        error_rx: channels.error_rx,
        cancel,
        covered_roots,
        walk_handle,
    })
}

/// Stat and classify every root, recording the device of each one. Duplicate roots are dropped.
fn seed_roots<P: AsRef<Path>>(
    roots: &[P],
    follow_links: bool,
    devices: &mut FilesystemTracker,
) -> SeededRoots {
    let mut seen = HashSet::new();
    let mut seeded = SeededRoots {
        dirs: Vec::new(),
        others: Vec::new(),
        covered: Vec::new(),
        errors: Vec::new(),
    };
    for root in roots {
        let root = root.as_ref();
        if !seen.insert(root.to_path_buf()) {
            debug!("Duplicate root {} ignored", root.display());
            continue;
        }
        let meta = match classify_path(root, follow_links) {
            Ok(m) => m,
            Err(e) => {
                seeded.errors.push(WalkError::stat(root, e));
                continue;
            }
        };
        if let Some(dev) = meta.ext.dev {
            if let Some(first) = devices.root_for(dev) {
                debug!("{} shares a filesystem with {}", root.display(), first.display());
            }
            devices.track_device(dev, root);
        }
        match meta.kind {
            EntryKind::Directory => seeded.dirs.push(root.to_path_buf()),
            EntryKind::RegularFile | EntryKind::Symlink => {
                seeded.others.push((root.to_path_buf(), meta))
            }
            EntryKind::Other => debug!("{} is not a file or directory, ignored", root.display()),
        }
    }
    seeded
}

/// Keep each subtree walked once. A directory root inside another directory root is not queued
/// again (its row still comes from the prefix totals). A file root the enclosing walk will size
/// moves to `covered`.
fn drop_nested_roots(seeded: &mut SeededRoots, show_all: bool) {
    let outer = seeded.dirs.clone();
    let inside = |root: &Path, leaf_may_be_link: bool| {
        outer
            .iter()
            .any(|dir| reached_by_walk(dir, root, leaf_may_be_link))
    };

    seeded.dirs.retain(|dir| {
        let nested = inside(dir, false);
        if nested {
            debug!("{} is inside another root, not walked twice", dir.display());
        }
        !nested
    });
    let (covered, others): (Vec<_>, Vec<_>) = std::mem::take(&mut seeded.others)
        .into_iter()
        .partition(|(path, meta)| match meta.kind {
            EntryKind::RegularFile => inside(path, show_all),
            // Unresolved links are only sized by the walk in show-all mode.
            _ => show_all && inside(path, true),
        });
    seeded.others = others;
    seeded.covered = covered;
}

/// True when walking `outer` reaches `inner`: `inner` lies strictly below it and every step in
/// between is a plain, non-symlink component. The walk never descends through links.
fn reached_by_walk(outer: &Path, inner: &Path, leaf_may_be_link: bool) -> bool {
    let Ok(rest) = inner.strip_prefix(outer) else {
        return false;
    };
    let parts: Vec<Component> = rest.components().collect();
    if parts.is_empty() || parts.iter().any(|c| !matches!(c, Component::Normal(_))) {
        return false;
    }
    let mut cur = outer.to_path_buf();
    parts.iter().enumerate().all(|(i, part)| {
        cur.push(part);
        (leaf_may_be_link && i + 1 == parts.len()) || !cur.is_symlink()
    })
}

/// Orchestrator body: publish root results, enqueue root directories, wait for the counter to
/// drain, then release the workers. Streams close once the workers and this thread drop their
/// senders.
fn run_walk(
    ctx: &WalkContext,
    chans: &WorkerChannels,
    dirs: Vec<PathBuf>,
    root_entries: Vec<Entry>,
    root_errors: Vec<WalkError>,
    shutdown_tx: Sender<()>,
    workers: Vec<JoinHandle<()>>,
) -> WalkStats {
    for err in root_errors {
        ctx.counters.record_error();
        let _ = chans.error_tx.send(err);
    }
    for entry in root_entries {
        let _ = chans.entry_tx.send(entry);
    }
    for dir in dirs {
        // Already counted in start_walk; if the queue is gone the item still has to retire.
        if chans.work_tx.send(dir).is_err() {
            ctx.pending.done();
        }
    }

    ctx.pending.wait_zero();
    debug!("Outstanding work drained, shutting down workers");
    drop(shutdown_tx);

    for h in workers {
        let _ = h.join();
    }
    let stats = ctx.counters.snapshot();
    if !ctx.hardlinks.is_empty() {
        debug!("{} multiply linked inode(s) tracked", ctx.hardlinks.len());
    }
    debug!("Walk finished: {:?}", stats);
    stats
}
