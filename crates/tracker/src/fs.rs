use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use crate::error::FsError;

/// Enumerates the names of the entries directly inside a directory.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list(&self, path: &Path) -> Result<Vec<String>, FsError>;
}

/// Fetches per-entry metadata.
#[async_trait]
pub trait FileStat: Send + Sync {
    async fn stat(&self, path: &Path) -> Result<EntryMetadata, FsError>;
}

/// Creates a directory if it is not already there.
#[async_trait]
pub trait DirectoryEnsurer: Send + Sync {
    /// Succeeds without doing anything when the directory already exists.
    async fn ensure_directory(&self, path: &Path, create_intermediates: bool)
        -> Result<(), FsError>;
}

/// Everything the tracker needs from its host filesystem.
pub trait StatusFs: DirectoryLister + FileStat + DirectoryEnsurer + 'static {}

impl<T> StatusFs for T where T: DirectoryLister + FileStat + DirectoryEnsurer + 'static {}

/// Metadata reported by [`FileStat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub exists: bool,
    pub modified_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Host filesystem backed by `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DirectoryLister for LocalFs {
    async fn list(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let mut rd = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
        {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    tracing::warn!("Skipping non UTF-8 entry name {:?} in {}", raw, path.display());
                }
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl FileStat for LocalFs {
    /// `exists` is false for anything that is not a regular file.
    async fn stat(&self, path: &Path) -> Result<EntryMetadata, FsError> {
        let md = tokio::fs::metadata(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;

        entry_metadata(path, md.is_file(), md.len(), md.modified())
    }
}

/// An unreadable modification time fails the stat rather than guessing one.
fn entry_metadata(
    path: &Path,
    is_file: bool,
    len: u64,
    modified: std::io::Result<SystemTime>,
) -> Result<EntryMetadata, FsError> {
    let modified = modified.map_err(|e| FsError::from_io(path, e))?;
    Ok(EntryMetadata {
        exists: is_file,
        modified_at: DateTime::<Utc>::from(modified),
        size_bytes: len,
    })
}

#[async_trait]
impl DirectoryEnsurer for LocalFs {
    async fn ensure_directory(
        &self,
        path: &Path,
        create_intermediates: bool,
    ) -> Result<(), FsError> {
        let result = if create_intermediates {
            tokio::fs::create_dir_all(path).await
        } else {
            tokio::fs::create_dir(path).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                match tokio::fs::metadata(path).await {
                    Ok(md) if md.is_dir() => Ok(()),
                    Ok(_) => Err(FsError::Other {
                        path: path.to_path_buf(),
                        reason: "exists and is not a directory".to_string(),
                    }),
                    Err(e) => Err(FsError::from_io(path, e)),
                }
            }
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }
}

/// In-memory filesystem for tests.
/// Paths are treated literally; callers should stick to absolute paths.
#[derive(Debug, Default)]
pub struct InMemoryFs {
    nodes: Mutex<HashMap<PathBuf, Node>>,
    stat_delay: Mutex<Option<Duration>>,
    path_delays: Mutex<HashMap<PathBuf, Duration>>,
    stat_calls: AtomicUsize,
}

#[derive(Debug, Clone)]
enum Node {
    Dir { children: Vec<String>, listable: bool },
    File { len: u64, modified: DateTime<Utc> },
    Broken { reason: String },
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        let mut nodes = self.nodes();
        if nodes.contains_key(&path) {
            return;
        }
        link_into_parent(&mut nodes, &path);
        nodes.insert(
            path,
            Node::Dir {
                children: Vec::new(),
                listable: true,
            },
        );
    }

    pub fn add_file<P: Into<PathBuf>>(&self, path: P, len: u64, modified: DateTime<Utc>) {
        let path = path.into();
        let mut nodes = self.nodes();
        link_into_parent(&mut nodes, &path);
        nodes.insert(path, Node::File { len, modified });
    }

    /// Adds an entry that lists normally but fails every stat call.
    pub fn add_unreadable_file<P: Into<PathBuf>>(&self, path: P, reason: &str) {
        let path = path.into();
        let mut nodes = self.nodes();
        link_into_parent(&mut nodes, &path);
        nodes.insert(
            path,
            Node::Broken {
                reason: reason.to_string(),
            },
        );
    }

    /// Makes listing the directory fail with permission denied.
    pub fn deny_listing<P: AsRef<Path>>(&self, path: P) {
        if let Some(Node::Dir { listable, .. }) = self.nodes().get_mut(path.as_ref()) {
            *listable = false;
        }
    }

    pub fn allow_listing<P: AsRef<Path>>(&self, path: P) {
        if let Some(Node::Dir { listable, .. }) = self.nodes().get_mut(path.as_ref()) {
            *listable = true;
        }
    }

    /// Removes a node and unlinks it from its parent. Children of a removed
    /// directory are left dangling.
    pub fn remove<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref();
        let mut nodes = self.nodes();
        nodes.remove(path);
        if let (Some(parent), Some(name)) = (path.parent(), file_name_of(path)) {
            if let Some(Node::Dir { children, .. }) = nodes.get_mut(parent) {
                children.retain(|c| *c != name);
            }
        }
    }

    /// Every stat call sleeps for `delay` before answering.
    pub fn set_stat_delay(&self, delay: Duration) {
        *self
            .stat_delay
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(delay);
    }

    /// Stat calls for `path` sleep for `delay`, overriding the global delay.
    pub fn set_path_delay<P: Into<PathBuf>>(&self, path: P, delay: Duration) {
        self.path_delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into(), delay);
    }

    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::SeqCst)
    }

    pub fn is_dir<P: AsRef<Path>>(&self, path: P) -> bool {
        matches!(self.nodes().get(path.as_ref()), Some(Node::Dir { .. }))
    }

    fn nodes(&self) -> MutexGuard<'_, HashMap<PathBuf, Node>> {
        self.nodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
}

fn link_into_parent(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
    let (Some(parent), Some(name)) = (path.parent(), file_name_of(path)) else {
        return;
    };

    if !nodes.contains_key(parent) {
        link_into_parent(nodes, parent);
        nodes.insert(
            parent.to_path_buf(),
            Node::Dir {
                children: Vec::new(),
                listable: true,
            },
        );
    }

    if let Some(Node::Dir { children, .. }) = nodes.get_mut(parent) {
        if !children.iter().any(|c| *c == name) {
            children.push(name);
        }
    }
}

#[async_trait]
impl DirectoryLister for InMemoryFs {
    async fn list(&self, path: &Path) -> Result<Vec<String>, FsError> {
        match self.nodes().get(path) {
            Some(Node::Dir {
                children,
                listable: true,
            }) => Ok(children.clone()),
            Some(Node::Dir { listable: false, .. }) => {
                Err(FsError::PermissionDenied(path.to_path_buf()))
            }
            Some(_) => Err(FsError::Other {
                path: path.to_path_buf(),
                reason: "not a directory".to_string(),
            }),
            None => Err(FsError::NotFound(path.to_path_buf())),
        }
    }
}

#[async_trait]
impl FileStat for InMemoryFs {
    async fn stat(&self, path: &Path) -> Result<EntryMetadata, FsError> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);

        let path_delay = self
            .path_delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .copied();
        let global_delay = *self
            .stat_delay
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let delay = path_delay.or(global_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let node = self.nodes().get(path).cloned();
        match node {
            Some(Node::File { len, modified }) => Ok(EntryMetadata {
                exists: true,
                modified_at: modified,
                size_bytes: len,
            }),
            Some(Node::Dir { .. }) => Ok(EntryMetadata {
                exists: false,
                modified_at: DateTime::<Utc>::from(SystemTime::UNIX_EPOCH),
                size_bytes: 0,
            }),
            Some(Node::Broken { reason }) => Err(FsError::Other {
                path: path.to_path_buf(),
                reason,
            }),
            None => Err(FsError::NotFound(path.to_path_buf())),
        }
    }
}

#[async_trait]
impl DirectoryEnsurer for InMemoryFs {
    async fn ensure_directory(
        &self,
        path: &Path,
        create_intermediates: bool,
    ) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        match nodes.get(path) {
            Some(Node::Dir { .. }) => return Ok(()),
            Some(_) => {
                return Err(FsError::Other {
                    path: path.to_path_buf(),
                    reason: "exists and is not a directory".to_string(),
                })
            }
            None => {}
        }

        if let Some(parent) = path.parent() {
            let parent_is_dir = matches!(nodes.get(parent), Some(Node::Dir { .. }));
            if !parent_is_dir && !parent.as_os_str().is_empty() && !create_intermediates {
                return Err(FsError::NotFound(parent.to_path_buf()));
            }
        }

        link_into_parent(&mut nodes, path);
        nodes.insert(
            path.to_path_buf(),
            Node::Dir {
                children: Vec::new(),
                listable: true,
            },
        );
        Ok(())
    }
}
