//! Engine settings and where they live on disk.
//!
//! Directory priority: CLI `--config-dir` → `SYNCVIEW_CONFIG_DIR` → local
//! folder if it already holds syncview files → platform dirs (`dirs-next`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::clock::DEFAULT_FRAME_RATE;

pub const CONFIG_FILE: &str = "syncview.json";
pub const LOG_FILE: &str = "syncview.log";

/// What sampling does when the primary surface reports an I/O error mid-playback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryErrorPolicy {
    /// Sample the first registered surface that has no recorded error
    #[default]
    Failover,
    /// Keep sampling the primary; failed reads are dropped, the clock freezes
    Freeze,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Frame rate assumed until a session reports its own
    pub default_frame_rate: f64,
    /// Ceiling for forwarded scrub updates per second
    pub scrub_max_rate_hz: f64,
    pub primary_error_policy: PrimaryErrorPolicy,
    /// Flip to paused when the sampled surface reaches the end
    pub pause_on_end: bool,
    /// Align (and start, if playing) surfaces that register mid-session
    pub snap_late_joiners: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_frame_rate: DEFAULT_FRAME_RATE,
            scrub_max_rate_hz: 30.0,
            primary_error_policy: PrimaryErrorPolicy::Failover,
            pause_on_end: true,
            snap_late_joiners: true,
        }
    }
}

impl SyncConfig {
    /// Load from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Overrides for default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (SYNCVIEW_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var("SYNCVIEW_CONFIG_DIR").ok().map(PathBuf::from));
        Self { config_dir }
    }
}

pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Logs and other generated files
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }
    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [CONFIG_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(current_dir) = std::env::current_dir()
        && has_local_config_files(&current_dir)
    {
        return current_dir;
    }
    platform
        .map(|dir| dir.join("syncview"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir())
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir())
}
