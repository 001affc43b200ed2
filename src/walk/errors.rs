//! Per-path walk errors. None of these abort the walk; each is reported once on the error stream.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Kind tag for a [`WalkError`], for callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkErrorKind {
    Stat,
    Open,
    ReadDir,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum WalkError {
    /// Path inaccessible or vanished mid-walk.
    #[error("cannot stat '{}': {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory could not be opened (usually permissions).
    #[error("cannot open directory '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Listing failed part-way; nothing from this directory is counted.
    #[error("cannot read directory '{}': {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cancellation was requested; `path` is the first item that was skipped.
    #[error("walk cancelled at '{}'; remaining work skipped", path.display())]
    Cancelled { path: PathBuf },
}

impl WalkError {
    pub fn stat(path: &Path, source: io::Error) -> Self {
        WalkError::Stat {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn open(path: &Path, source: io::Error) -> Self {
        WalkError::Open {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn read_dir(path: &Path, source: io::Error) -> Self {
        WalkError::ReadDir {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WalkError::Stat { path, .. }
            | WalkError::Open { path, .. }
            | WalkError::ReadDir { path, .. }
            | WalkError::Cancelled { path } => path,
        }
    }

    pub fn kind(&self) -> WalkErrorKind {
        match self {
            WalkError::Stat { .. } => WalkErrorKind::Stat,
            WalkError::Open { .. } => WalkErrorKind::Open,
            WalkError::ReadDir { .. } => WalkErrorKind::ReadDir,
            WalkError::Cancelled { .. } => WalkErrorKind::Cancelled,
        }
    }
}
