use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by one of the filesystem collaborators.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {reason}", path.display())]
    Other { path: PathBuf, reason: String },
}

impl FsError {
    /// Map an io error onto the collaborator taxonomy.
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path),
            _ => FsError::Io { path, source: err },
        }
    }
}

/// Errors that abort a scan. Per-entry stat failures never show up here.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("cannot list source directory {}: {source}", path.display())]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("cannot ensure working directory {}: {source}", path.display())]
    EnsureDirectory {
        path: PathBuf,
        #[source]
        source: FsError,
    },
}
