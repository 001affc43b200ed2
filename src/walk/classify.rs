//! Entry classification: one tagged kind per filesystem entry, plus optional extended metadata.

use std::fs::{self, FileType, Metadata};
use std::io;
use std::path::Path;

/// What the walker does with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Enqueued as a work item.
    Directory,
    /// Sized and added to the parent's local total.
    RegularFile,
    /// Shown (and optionally resolved) only in show-all mode.
    Symlink,
    /// Device files, sockets, fifos. Ignored.
    Other,
}

impl EntryKind {
    pub fn of(ft: &FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::RegularFile
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }
}

/// Identity of a file for hardlink dedup. Inode numbers are only unique within a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub dev: u64,
    pub ino: u64,
}

/// Platform metadata the walker needs beyond `std::fs::Metadata`'s portable surface.
/// Every field is `None` where the platform does not expose it; dedup and one-filesystem
/// checks then pass everything through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtMeta {
    pub dev: Option<u64>,
    pub ino: Option<u64>,
    pub nlink: Option<u64>,
}

impl ExtMeta {
    #[cfg(unix)]
    pub fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: Some(meta.dev()),
            ino: Some(meta.ino()),
            nlink: Some(meta.nlink()),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(_meta: &Metadata) -> Self {
        Self::default()
    }

    pub fn file_id(&self) -> Option<FileId> {
        Some(FileId {
            dev: self.dev?,
            ino: self.ino?,
        })
    }

    /// True when the file has more than one name and needs a hardlink claim before counting.
    pub fn is_hardlinked(&self) -> bool {
        self.nlink.is_some_and(|n| n > 1)
    }
}

/// Classification of one path: kind, apparent size and extended metadata, computed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub kind: EntryKind,
    pub size: u64,
    pub ext: ExtMeta,
}

impl Classified {
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            kind: EntryKind::of(&meta.file_type()),
            size: meta.len(),
            ext: ExtMeta::from_metadata(meta),
        }
    }
}

/// stat when following links, lstat otherwise.
pub fn stat(path: &Path, follow_links: bool) -> io::Result<Metadata> {
    if follow_links {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    }
}

pub fn classify_path(path: &Path, follow_links: bool) -> io::Result<Classified> {
    stat(path, follow_links).map(|m| Classified::from_metadata(&m))
}
