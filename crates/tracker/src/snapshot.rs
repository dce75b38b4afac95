use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::registry::ViewedEntry;

pub const SNAPSHOT_FILE_NAME: &str = "viewed_statuses.json";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub entries: Vec<ViewedEntry>,
}

pub fn snapshot_path(work_dir: &Path) -> PathBuf {
    work_dir.join(SNAPSHOT_FILE_NAME)
}

/// Persist `entries` into `work_dir`, replacing any previous snapshot.
pub fn save_snapshot(work_dir: &Path, entries: &[ViewedEntry]) -> Result<()> {
    fs::create_dir_all(work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        entries: entries.to_vec(),
    };
    let json = serde_json::to_string_pretty(&snapshot)?;

    // Write atomically using a temporary file
    let final_path = snapshot_path(work_dir);
    let temp_path = work_dir.join(format!("{}.tmp", SNAPSHOT_FILE_NAME));

    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("Failed to create {}", temp_path.display()))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, &final_path)
        .with_context(|| format!("Failed to move snapshot into {}", final_path.display()))?;

    Ok(())
}

/// Entries stored in `work_dir`, or nothing if no snapshot was written yet.
pub fn load_snapshot(work_dir: &Path) -> Result<Vec<ViewedEntry>> {
    let path = snapshot_path(work_dir);
    if !path.exists() {
        return Ok(vec![]);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        anyhow::bail!(
            "Unsupported snapshot version {} in {}",
            snapshot.version,
            path.display()
        );
    }

    Ok(snapshot.entries)
}
