use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub source_dir: PathBuf,
    pub work_dir: PathBuf,
    pub image_extensions: Vec<String>,
    pub max_concurrent_stats: usize,
    pub persist_registry: bool,
    pub refresh_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(
                "/storage/emulated/0/Android/media/com.whatsapp/WhatsApp/Media/.Statuses",
            ),
            work_dir: PathBuf::from("/var/lib/statsaver/cache"),
            image_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
            max_concurrent_stats: 8,
            persist_registry: false,
            refresh_interval_secs: 30,
        }
    }
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<TrackerConfig> {
    let config = if let Some(config_path) = path {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

            toml::from_str::<TrackerConfig>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?
        } else {
            #[cfg(not(test))]
            tracing::warn!("Config file not found at {:?}, using defaults", config_path);
            TrackerConfig::default()
        }
    } else {
        #[cfg(not(test))]
        tracing::info!("No config path provided, using defaults");
        TrackerConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &TrackerConfig) -> Result<()> {
    if config.source_dir.as_os_str().is_empty() {
        anyhow::bail!("source_dir cannot be empty");
    }

    if config.image_extensions.is_empty() {
        anyhow::bail!("image_extensions cannot be empty");
    }

    if config
        .image_extensions
        .iter()
        .any(|ext| ext.trim_start_matches('.').is_empty())
    {
        anyhow::bail!("image_extensions cannot contain blank entries");
    }

    if config.max_concurrent_stats == 0 {
        anyhow::bail!("max_concurrent_stats must be at least 1");
    }

    if config.refresh_interval_secs == 0 {
        anyhow::bail!("refresh_interval_secs must be at least 1");
    }

    Ok(())
}
