use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::fs::{DirectoryEnsurer, DirectoryLister, EntryMetadata, StatusFs};
use crate::registry::{Registry, ViewedEntry};
use crate::scan::{is_image_file, ScanOutcome, ScanReport};
use crate::snapshot::{load_snapshot, save_snapshot};
use crate::stats::{compute_stats, AggregateStats};

/// Owns the viewed registry and its summary.
///
/// Scans run to completion one at a time: [`scan`](Self::scan) waits for an
/// in-flight scan, [`try_scan`](Self::try_scan) gives up instead. Readers get
/// cloned snapshots and never observe a half-merged scan.
pub struct ViewedStatusTracker<F: StatusFs> {
    fs: Arc<F>,
    config: TrackerConfig,
    state: RwLock<TrackerState>,
    scan_lock: Mutex<()>,
}

#[derive(Debug, Default)]
struct TrackerState {
    registry: Registry,
    stats: AggregateStats,
}

enum Fetched {
    NotImage,
    Metadata(EntryMetadata),
    Failed(String),
}

impl<F: StatusFs> ViewedStatusTracker<F> {
    pub fn new(fs: F, config: TrackerConfig) -> Self {
        Self::with_shared_fs(Arc::new(fs), config)
    }

    pub fn with_shared_fs(fs: Arc<F>, config: TrackerConfig) -> Self {
        Self {
            fs,
            config,
            state: RwLock::new(TrackerState::default()),
            scan_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Registry contents, most recently modified first.
    pub async fn entries(&self) -> Vec<ViewedEntry> {
        self.state.read().await.registry.entries().to_vec()
    }

    pub async fn stats(&self) -> AggregateStats {
        self.state.read().await.stats.clone()
    }

    /// Entries and stats taken under the same read lock.
    pub async fn view(&self) -> (Vec<ViewedEntry>, AggregateStats) {
        let state = self.state.read().await;
        (state.registry.entries().to_vec(), state.stats.clone())
    }

    /// Scan the source directory, waiting for any scan already in progress.
    pub async fn scan(&self) -> Result<ScanReport, TrackerError> {
        let _guard = self.scan_lock.lock().await;
        self.scan_exclusive().await
    }

    /// Like [`scan`](Self::scan) but returns `Ok(None)` right away when
    /// another scan holds the lock.
    pub async fn try_scan(&self) -> Result<Option<ScanReport>, TrackerError> {
        let Ok(_guard) = self.scan_lock.try_lock() else {
            debug!("Scan already in progress, suppressing refresh");
            return Ok(None);
        };
        self.scan_exclusive().await.map(Some)
    }

    /// Merge the snapshot stored in the working directory into the registry.
    /// Returns how many entries were new.
    pub async fn restore_snapshot(&self) -> anyhow::Result<usize> {
        let _guard = self.scan_lock.lock().await;

        let work_dir = self.config.work_dir.clone();
        let loaded = tokio::task::spawn_blocking(move || load_snapshot(&work_dir)).await??;
        let mut state = self.state.write().await;

        let mut restored = 0;
        for entry in loaded {
            if state.registry.insert(entry) {
                restored += 1;
            }
        }
        state.registry.sort_by_recency();
        state.stats = compute_stats(state.registry.entries());

        info!(
            "Restored {} viewed entries from {}",
            restored,
            self.config.work_dir.display()
        );
        Ok(restored)
    }

    async fn scan_exclusive(&self) -> Result<ScanReport, TrackerError> {
        let work_dir = &self.config.work_dir;
        self.fs
            .ensure_directory(work_dir, true)
            .await
            .map_err(|source| TrackerError::EnsureDirectory {
                path: work_dir.clone(),
                source,
            })?;

        let source_dir = &self.config.source_dir;
        debug!("Listing source directory: {}", source_dir.display());
        let names = self
            .fs
            .list(source_dir)
            .await
            .map_err(|source| TrackerError::DirectoryAccess {
                path: source_dir.clone(),
                source,
            })?;

        let paths: Vec<PathBuf> = names.iter().map(|name| source_dir.join(name)).collect();
        let fetched = self.fetch_all(&paths).await;

        let mut report = ScanReport::default();
        let mut state = self.state.write().await;

        for (path, fetched) in paths.into_iter().zip(fetched) {
            let outcome = match fetched {
                Fetched::NotImage => ScanOutcome::SkippedType,
                Fetched::Failed(reason) => {
                    warn!("Failed to get metadata for {}: {}", path.display(), reason);
                    ScanOutcome::SkippedError(reason)
                }
                Fetched::Metadata(meta) if !meta.exists => {
                    warn!("Entry vanished or is not a file: {}", path.display());
                    ScanOutcome::SkippedError("not a regular file".to_string())
                }
                Fetched::Metadata(_) if state.registry.contains_path(&path) => {
                    ScanOutcome::SkippedDuplicate
                }
                Fetched::Metadata(meta) => {
                    state.registry.insert(ViewedEntry {
                        source_path: path.clone(),
                        modified_at: meta.modified_at,
                        size_bytes: meta.size_bytes,
                    });
                    ScanOutcome::Accepted
                }
            };
            debug!("{}: {:?}", path.display(), outcome);
            report.record(path, outcome);
        }

        state.registry.sort_by_recency();
        state.stats = compute_stats(state.registry.entries());

        info!(
            "Scan complete: {} new, {} duplicate, {} unsupported, {} failed; {} viewed ({})",
            report.accepted(),
            report.skipped_duplicate(),
            report.skipped_type(),
            report.skipped_error(),
            state.stats.total_count,
            state.stats.formatted_size
        );

        let persisted = self
            .config
            .persist_registry
            .then(|| state.registry.entries().to_vec());
        drop(state);

        if let Some(entries) = persisted {
            let dir = work_dir.clone();
            match tokio::task::spawn_blocking(move || save_snapshot(&dir, &entries)).await {
                Ok(Ok(())) => debug!("Saved viewed snapshot to {}", work_dir.display()),
                Ok(Err(e)) => warn!("Failed to save viewed snapshot: {:#}", e),
                Err(e) => warn!("Snapshot task failed: {}", e),
            }
        }

        Ok(report)
    }

    /// Stat every image path with bounded fan-out. The result lines up with
    /// `paths` no matter which order the fetches complete in.
    async fn fetch_all(&self, paths: &[PathBuf]) -> Vec<Fetched> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_stats.max(1)));
        let mut tasks = JoinSet::new();
        let mut results: Vec<Option<Fetched>> = Vec::with_capacity(paths.len());

        for (idx, path) in paths.iter().enumerate() {
            if !is_image_file(path, &self.config.image_extensions) {
                results.push(Some(Fetched::NotImage));
                continue;
            }
            results.push(None);

            let fs = Arc::clone(&self.fs);
            let semaphore = Arc::clone(&semaphore);
            let path = path.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (idx, Fetched::Failed(e.to_string())),
                };
                match fs.stat(&path).await {
                    Ok(meta) => (idx, Fetched::Metadata(meta)),
                    Err(e) => (idx, Fetched::Failed(e.to_string())),
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, fetched)) => results[idx] = Some(fetched),
                Err(e) => warn!("Metadata task failed: {}", e),
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Fetched::Failed("metadata task failed".to_string())))
            .collect()
    }
}
