//! Worker pool: each worker pulls directories from the shared queue, sizes their immediate files,
//! emits results and feeds subdirectories back into the queue.

use anyhow::{Context, Result};
use crossbeam_channel::{TrySendError, select};
use log::{debug, trace};
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::Entry;
use crate::utils::config::PackagePaths;

use super::classify::{Classified, EntryKind, stat};
use super::context::{WalkContext, WorkerChannels};
use super::errors::WalkError;

/// Spawn `num_threads` workers. They block on the queue until work arrives and exit once the
/// shutdown channel disconnects.
pub fn spawn_workers(
    ctx: &Arc<WalkContext>,
    chans: &WorkerChannels,
    num_threads: usize,
) -> Result<Vec<JoinHandle<()>>> {
    (0..num_threads)
        .map(|id| {
            let ctx = Arc::clone(ctx);
            let chans = chans.clone();
            thread::Builder::new()
                .name(format!("{}-walker-{id}", PackagePaths::get().pkg_name()))
                .spawn(move || worker_loop(id, ctx, chans))
                .with_context(|| format!("spawn walk worker {id}"))
        })
        .collect()
}

fn worker_loop(id: usize, ctx: Arc<WalkContext>, chans: WorkerChannels) {
    trace!("worker {id} starting");
    loop {
        select! {
            recv(chans.work_rx) -> msg => match msg {
                Ok(path) => run_item(&ctx, &chans, path),
                Err(_) => break,
            },
            recv(chans.shutdown_rx) -> _ => break,
        }
    }
    trace!("worker {id} exiting");
}

/// Process one dequeued directory plus whatever overflowed into the local stack while doing so.
pub(crate) fn run_item(ctx: &WalkContext, chans: &WorkerChannels, path: PathBuf) {
    let mut local = vec![path];
    while let Some(dir) = local.pop() {
        process_directory(ctx, chans, &dir, &mut local);
        // Children were counted inside process_directory; only now may the parent retire.
        ctx.pending.done();
    }
}

/// List `path`, account its immediate files and enqueue its subdirectories.
/// Subdirectories that do not fit in the bounded queue go to `overflow` instead.
fn process_directory(
    ctx: &WalkContext,
    chans: &WorkerChannels,
    path: &Path,
    overflow: &mut Vec<PathBuf>,
) {
    if ctx.is_cancelled() {
        if ctx.counters.claim_cancel_report() {
            send_error(
                ctx,
                chans,
                WalkError::Cancelled {
                    path: path.to_path_buf(),
                },
            );
        }
        return;
    }

    let meta = match stat(path, ctx.opts.follow_links) {
        Ok(m) => Classified::from_metadata(&m),
        Err(e) => {
            send_error(ctx, chans, WalkError::stat(path, e));
            return;
        }
    };
    if meta.kind != EntryKind::Directory {
        debug!("{} is no longer a directory, skipping", path.display());
        return;
    }
    if !ctx.devices.is_allowed_device(meta.ext.dev) {
        debug!("{} is on another filesystem, pruned", path.display());
        ctx.counters.record_pruned();
        return;
    }

    let listing = match list_dir(path) {
        Ok(l) => l,
        Err(e) => {
            send_error(ctx, chans, e);
            return;
        }
    };
    ctx.counters.record_dir();

    let mut total = 0_u64;
    for dent in listing {
        let child = path.join(dent.file_name());
        let kind = match dent.file_type() {
            Ok(ft) => EntryKind::of(&ft),
            Err(e) => {
                send_error(ctx, chans, WalkError::stat(&child, e));
                continue;
            }
        };
        match kind {
            EntryKind::Directory => enqueue(ctx, chans, child, overflow),
            EntryKind::RegularFile => match dent.metadata() {
                Ok(m) => {
                    total += account_entry(ctx, chans, child, &Classified::from_metadata(&m))
                }
                Err(e) => send_error(ctx, chans, WalkError::stat(&child, e)),
            },
            EntryKind::Symlink if ctx.opts.show_all => {
                // An unresolvable link only loses itself; the rest of the listing continues.
                let resolved = if ctx.opts.follow_links {
                    fs::metadata(&child)
                } else {
                    dent.metadata()
                };
                match resolved {
                    Ok(m) => {
                        total += account_entry(ctx, chans, child, &Classified::from_metadata(&m))
                    }
                    Err(e) => send_error(ctx, chans, WalkError::stat(&child, e)),
                }
            }
            EntryKind::Symlink | EntryKind::Other => {}
        }
    }

    let _ = chans.entry_tx.send(Entry::dir(
        path.to_path_buf(),
        total,
        meta.ext.dev,
        meta.ext.ino,
    ));
}

/// Read the whole listing up front so a failing directory yields an error and no partial results.
fn list_dir(path: &Path) -> Result<Vec<DirEntry>, WalkError> {
    let rd = fs::read_dir(path).map_err(|e| WalkError::open(path, e))?;
    rd.collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| WalkError::read_dir(path, e))
}

/// Count before enqueue, so the parent's `done` can never bring the counter to zero early.
fn enqueue(
    ctx: &WalkContext,
    chans: &WorkerChannels,
    child: PathBuf,
    overflow: &mut Vec<PathBuf>,
) {
    ctx.pending.add(1);
    match chans.work_tx.try_send(child) {
        Ok(()) => {}
        Err(TrySendError::Full(child)) | Err(TrySendError::Disconnected(child)) => {
            overflow.push(child)
        }
    }
}

/// Size a non-directory entry: apply one-filesystem and hardlink checks, emit it in show-all
/// mode. Returns what it contributes to the parent's local total.
pub(crate) fn account_entry(
    ctx: &WalkContext,
    chans: &WorkerChannels,
    path: PathBuf,
    meta: &Classified,
) -> u64 {
    match counted_size(ctx, &path, meta) {
        Some(size) => {
            if ctx.opts.show_all {
                let _ = chans
                    .entry_tx
                    .send(Entry::file(path, size, meta.ext.dev, meta.ext.ino));
            }
            size
        }
        None => 0,
    }
}

/// `None` when the entry must not be counted (foreign device or an already claimed inode).
pub(crate) fn counted_size(ctx: &WalkContext, path: &Path, meta: &Classified) -> Option<u64> {
    if !ctx.devices.is_allowed_device(meta.ext.dev) {
        ctx.counters.record_pruned();
        return None;
    }
    if meta.ext.is_hardlinked()
        && let Some(id) = meta.ext.file_id()
        && ctx.hardlinks.try_claim_inode(id, path)
    {
        trace!(
            "{} already counted via {:?}",
            path.display(),
            ctx.hardlinks.first_path(id)
        );
        ctx.counters.record_hardlink_skip();
        return None;
    }
    ctx.counters.record_file();
    Some(meta.size)
}

pub(crate) fn send_error(ctx: &WalkContext, chans: &WorkerChannels, err: WalkError) {
    ctx.counters.record_error();
    let _ = chans.error_tx.send(err);
}
