//! Walk tests against real temp directory trees.

use pardu::{
    Entry, WalkError, WalkErrorKind, WalkOpts, WalkStats, du, start_walk, start_walk_with_cancel,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use tempfile::TempDir;
use walkdir::WalkDir;

fn write_file(path: &Path, len: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![b'x'; len]).unwrap();
}

/// `a/{x:100, y:50, b/{z:25}}`
fn example_tree() -> (TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("a");
    write_file(&a.join("x"), 100);
    write_file(&a.join("y"), 50);
    write_file(&a.join("b").join("z"), 25);
    (tmp, a)
}

/// A few levels of nesting with uneven fan-out.
fn wide_tree() -> (TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    for i in 0..6 {
        for j in 0..4 {
            let d = root.join(format!("d{i}")).join(format!("e{j}"));
            for k in 0..3 {
                write_file(&d.join(format!("f{k}")), 10 * (i + 1) + j + k);
            }
        }
        write_file(&root.join(format!("d{i}")).join("top"), 7 * i);
    }
    fs::create_dir_all(root.join("empty").join("deeper")).unwrap();
    (tmp, root)
}

fn regular_file_bytes(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.metadata().unwrap().len())
        .sum()
}

fn opts() -> WalkOpts {
    WalkOpts {
        num_threads: Some(4),
        ..WalkOpts::default()
    }
}

/// Drain both streams the way a caller must: errors on their own thread.
fn collect<P: AsRef<Path>>(
    roots: &[P],
    opts: &WalkOpts,
) -> (Vec<Entry>, Vec<WalkError>, WalkStats) {
    let handles = start_walk(roots, opts).unwrap();
    let error_rx = handles.error_rx.clone();
    let errors = thread::spawn(move || error_rx.iter().collect::<Vec<_>>());
    let entries: Vec<Entry> = handles.entry_rx.iter().collect();
    let errors = errors.join().unwrap();
    let stats = handles.walk_handle.join().unwrap();
    (entries, errors, stats)
}

fn size_of(entries: &[Entry], path: &Path) -> Option<u64> {
    entries.iter().find(|e| e.path == path).map(|e| e.size)
}

#[test]
fn test_example_tree_local_and_recursive_totals() {
    let (_tmp, a) = example_tree();
    let (entries, errors, stats) = collect(&[&a], &opts());
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.is_dir));
    assert_eq!(size_of(&entries, &a), Some(150));
    assert_eq!(size_of(&entries, &a.join("b")), Some(25));
    assert_eq!(stats.dirs, 2);
    assert_eq!(stats.files, 3);

    let summary = du(&[&a], &opts()).unwrap();
    assert_eq!(summary.total, 175);
    assert_eq!(summary.rows, vec![(a.clone(), 175)]);
}

#[test]
fn test_conservation_directory_totals() {
    let (_tmp, root) = wide_tree();
    let expected = regular_file_bytes(&root);
    let (entries, errors, _) = collect(&[&root], &opts());
    assert!(errors.is_empty(), "{errors:?}");
    let dir_sum: u64 = entries.iter().filter(|e| e.is_dir).map(|e| e.size).sum();
    assert_eq!(dir_sum, expected);
    // every directory, including empty ones, reports once
    let dir_count = WalkDir::new(&root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .count();
    assert_eq!(entries.iter().filter(|e| e.is_dir).count(), dir_count);
}

#[test]
fn test_conservation_show_all_files() {
    let (_tmp, root) = wide_tree();
    let expected = regular_file_bytes(&root);
    let walk_opts = WalkOpts {
        show_all: true,
        ..opts()
    };
    let (entries, errors, _) = collect(&[&root], &walk_opts);
    assert!(errors.is_empty(), "{errors:?}");
    let file_sum: u64 = entries.iter().filter(|e| !e.is_dir).map(|e| e.size).sum();
    let dir_sum: u64 = entries.iter().filter(|e| e.is_dir).map(|e| e.size).sum();
    assert_eq!(file_sum, expected);
    assert_eq!(dir_sum, expected);

    let summary = du(&[&root], &walk_opts).unwrap();
    assert_eq!(summary.total, expected);
    assert_eq!(summary.rows[0], (root.clone(), expected));
}

#[test]
fn test_rerun_gives_identical_totals() {
    let (_tmp, root) = wide_tree();
    let first = du(&[&root], &opts()).unwrap();
    let second = du(
        &[&root],
        &WalkOpts {
            num_threads: Some(1),
            ..opts()
        },
    )
    .unwrap();
    assert_eq!(first.total, second.total);
    assert_eq!(first.rows, second.rows);
}

#[test]
fn test_tiny_queue_overflows_into_worker_stack() {
    let (_tmp, root) = wide_tree();
    let expected = regular_file_bytes(&root);
    let summary = du(
        &[&root],
        &WalkOpts {
            num_threads: Some(1),
            channel_cap: 1,
            ..WalkOpts::default()
        },
    )
    .unwrap();
    assert!(summary.errors.is_empty());
    assert_eq!(summary.total, expected);
}

#[test]
fn test_flat_roots_complete_with_every_file() {
    let tmp = tempfile::tempdir().unwrap();
    let counts = [3_usize, 0, 5, 1];
    let roots: Vec<PathBuf> = counts
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let r = tmp.path().join(format!("r{i}"));
            fs::create_dir_all(&r).unwrap();
            for k in 0..*n {
                write_file(&r.join(format!("f{k}")), k + 1);
            }
            r
        })
        .collect();
    let (entries, errors, _) = collect(
        &roots,
        &WalkOpts {
            show_all: true,
            ..opts()
        },
    );
    assert!(errors.is_empty());
    assert_eq!(
        entries.iter().filter(|e| !e.is_dir).count(),
        counts.iter().sum::<usize>()
    );
    assert_eq!(entries.iter().filter(|e| e.is_dir).count(), roots.len());
}

#[test]
fn test_file_root_never_queued() {
    let (_tmp, a) = example_tree();
    let x = a.join("x");
    let (entries, errors, stats) = collect(&[&x], &opts());
    assert!(errors.is_empty());
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].is_dir);
    assert_eq!(entries[0].path, x);
    assert_eq!(entries[0].size, 100);
    assert_eq!(stats.dirs, 0);

}

// --- overlapping roots ---

#[test]
fn test_nested_directory_root_walked_once() {
    let (_tmp, a) = example_tree();
    let b = a.join("b");
    for roots in [[&a, &b], [&b, &a]] {
        let summary = du(&roots, &opts()).unwrap();
        assert!(summary.errors.is_empty(), "{:?}", summary.errors);
        assert_eq!(summary.rows, vec![(a.clone(), 175), (b.clone(), 25)]);
        assert_eq!(summary.total, 175);
        assert_eq!(summary.stats.dirs, 2);
    }
}

#[test]
fn test_nested_file_root_listed_not_recounted() {
    let (_tmp, a) = example_tree();
    let x = a.join("x");
    let summary = du(&[&a, &x], &opts()).unwrap();
    assert_eq!(summary.rows, vec![(a.clone(), 175), (x.clone(), 100)]);
    assert_eq!(summary.total, 175);

    let summary = du(
        &[&a, &x],
        &WalkOpts {
            show_all: true,
            ..opts()
        },
    )
    .unwrap();
    assert_eq!(summary.total, 175);
    assert_eq!(summary.rows.iter().filter(|(p, _)| *p == x).count(), 1);
    assert_eq!(summary.rows[0], (a.clone(), 175));
}

#[test]
fn test_sibling_file_root_still_counted() {
    let (tmp, a) = example_tree();
    let outside = tmp.path().join("outside");
    write_file(&outside, 40);
    let summary = du(&[&a, &outside], &opts()).unwrap();
    assert_eq!(summary.total, 215);
    assert_eq!(summary.rows, vec![(a.clone(), 175), (outside.clone(), 40)]);
}

#[test]
fn test_missing_root_reported_others_walked() {
    let (tmp, a) = example_tree();
    let missing = tmp.path().join("nope");
    let summary = du(&[&missing, &a], &opts()).unwrap();
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].kind(), WalkErrorKind::Stat);
    assert_eq!(summary.errors[0].path(), missing.as_path());
    assert_eq!(summary.total, 175);
}

#[test]
fn test_empty_roots_is_an_error() {
    let roots: [&Path; 0] = [];
    assert!(start_walk(&roots, &opts()).is_err());
}

#[test]
fn test_one_filesystem_same_device_keeps_everything() {
    let (_tmp, root) = wide_tree();
    let expected = regular_file_bytes(&root);
    let summary = du(
        &[&root],
        &WalkOpts {
            one_filesystem: true,
            ..opts()
        },
    )
    .unwrap();
    assert_eq!(summary.total, expected);
    assert_eq!(summary.stats.pruned, 0);
}

#[test]
fn test_cancel_before_first_pop_skips_every_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let roots: Vec<PathBuf> = (0..32)
        .map(|i| {
            let r = tmp.path().join(format!("r{i}"));
            write_file(&r.join("f"), 8);
            r
        })
        .collect();
    let walk_opts = WalkOpts {
        num_threads: Some(1),
        ..WalkOpts::default()
    };

    let cancel = Arc::new(AtomicBool::new(true));
    let handles = start_walk_with_cancel(&roots, &walk_opts, cancel).unwrap();
    let error_rx = handles.error_rx.clone();
    let errors = thread::spawn(move || error_rx.iter().collect::<Vec<_>>());
    let entries: Vec<Entry> = handles.entry_rx.iter().collect();
    let errors = errors.join().unwrap();
    let stats = handles.walk_handle.join().unwrap();

    assert_eq!(errors.len(), 1, "{errors:?}");
    assert_eq!(errors[0].kind(), WalkErrorKind::Cancelled);
    assert!(entries.is_empty());
    assert_eq!(stats.dirs, 0);

    // same roots, not cancelled
    let (_, errors, stats) = collect(&roots, &walk_opts);
    assert!(errors.is_empty());
    assert_eq!(stats.dirs, roots.len() as u64);
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::{PermissionsExt, symlink};

    #[test]
    fn test_hardlinks_counted_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("h");
        write_file(&root.join("orig"), 1000);
        write_file(&root.join("plain"), 10);
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::hard_link(root.join("orig"), root.join("sub").join("link")).unwrap();

        let walk_opts = WalkOpts {
            show_all: true,
            ..opts()
        };
        let (entries, errors, stats) = collect(&[&root], &walk_opts);
        assert!(errors.is_empty());
        let big: Vec<&Entry> = entries
            .iter()
            .filter(|e| !e.is_dir && e.size == 1000)
            .collect();
        assert_eq!(big.len(), 1);
        assert_eq!(stats.hardlinks_skipped, 1);

        let summary = du(&[&root], &opts()).unwrap();
        assert_eq!(summary.total, 1010);
    }

    #[test]
    fn test_hardlinked_root_files_counted_once() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        write_file(&a, 300);
        fs::hard_link(&a, &b).unwrap();
        let summary = du(&[&a, &b], &opts()).unwrap();
        assert_eq!(summary.total, 300);
        assert_eq!(summary.rows.len(), 1);
    }

    #[test]
    fn test_symlinked_nested_root_still_walked() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let ext = tmp.path().join("ext");
        write_file(&a.join("x"), 100);
        write_file(&ext.join("w"), 40);
        let l = a.join("l");
        symlink(&ext, &l).unwrap();

        let summary = du(
            &[&a, &l],
            &WalkOpts {
                follow_links: true,
                ..opts()
            },
        )
        .unwrap();
        assert!(summary.errors.is_empty(), "{:?}", summary.errors);
        assert_eq!(summary.rows, vec![(a.clone(), 140), (l.clone(), 40)]);
        assert_eq!(summary.total, 140);
    }

    #[test]
    fn test_symlinks_only_with_show_all() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("s");
        write_file(&root.join("target"), 64);
        symlink(root.join("target"), root.join("link")).unwrap();
        let link = root.join("link");

        let (entries, _, _) = collect(&[&root], &opts());
        assert_eq!(size_of(&entries, &root), Some(64));

        let (entries, _, _) = collect(
            &[&root],
            &WalkOpts {
                show_all: true,
                ..opts()
            },
        );
        let link_len = fs::symlink_metadata(&link).unwrap().len();
        assert_eq!(size_of(&entries, &link), Some(link_len));
        assert_eq!(size_of(&entries, &root), Some(64 + link_len));

        let (entries, _, _) = collect(
            &[&root],
            &WalkOpts {
                show_all: true,
                follow_links: true,
                ..opts()
            },
        );
        assert_eq!(size_of(&entries, &link), Some(64));
    }

    #[test]
    fn test_dangling_symlink_only_loses_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("d");
        write_file(&root.join("a"), 5);
        write_file(&root.join("z"), 7);
        symlink(root.join("gone"), root.join("m")).unwrap();

        let (entries, errors, _) = collect(
            &[&root],
            &WalkOpts {
                show_all: true,
                follow_links: true,
                ..opts()
            },
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), WalkErrorKind::Stat);
        assert_eq!(errors[0].path(), root.join("m").as_path());
        assert_eq!(size_of(&entries, &root), Some(12));
    }

    fn running_as_root() -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    #[test]
    fn test_unreadable_dir_isolated() {
        if running_as_root() {
            // root ignores directory permissions
            return;
        }
        let (_tmp, root) = wide_tree();
        let locked = root.join("d2");
        let locked_bytes = regular_file_bytes(&locked);
        let expected = regular_file_bytes(&root) - locked_bytes;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let summary = du(&[&root], &opts()).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(summary.errors.len(), 1, "{:?}", summary.errors);
        let err = &summary.errors[0];
        assert!(matches!(
            err.kind(),
            WalkErrorKind::Open | WalkErrorKind::ReadDir
        ));
        assert_eq!(err.path(), locked.as_path());
        assert_eq!(summary.total, expected);
    }
}
