use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::BatchSettings;
use crate::library::{PersistFailurePolicy, StoreOptions};
use crate::scan::ScanSettings;

/// Application configuration loaded from ~/.config/audioshelf/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Where the catalog lives and how it is loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Catalog directory (default: <data dir>/audioshelf/data)
    pub data_dir: Option<PathBuf>,

    /// Threads reading book directories at startup
    #[serde(default = "default_load_workers")]
    pub load_workers: usize,

    /// What to do with the catalog when writing it fails: "wipe" or "preserve"
    #[serde(default)]
    pub failure_policy: PersistFailurePolicy,
}

fn default_load_workers() -> usize {
    6
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            load_workers: default_load_workers(),
            failure_policy: PersistFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Upper bound on files held open while waiting for tag extraction
    #[serde(default = "default_max_open_files")]
    pub max_open_files: usize,

    /// Files per request to the tag decoder
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Only scan files with these extensions (empty: all files)
    #[serde(default)]
    pub extensions: Vec<String>,
}

fn default_max_open_files() -> usize {
    100
}

fn default_batch_threshold() -> usize {
    15
}

fn default_poll_interval_ms() -> u64 {
    300
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_open_files: default_max_open_files(),
            batch_threshold: default_batch_threshold(),
            poll_interval_ms: default_poll_interval_ms(),
            extensions: Vec::new(),
        }
    }
}

/// How to reach the external tag decoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Named pipe shared with the decoder (default: <data dir>/audioshelf/fifo)
    pub fifo_path: Option<PathBuf>,

    /// Decoder command line; `pipe=<fifo>` is appended when it is launched
    #[serde(default)]
    pub command: Vec<String>,

    /// How long to wait for the decoder to create the pipe or open its end of it
    #[serde(default = "default_fifo_timeout_ms")]
    pub fifo_timeout_ms: u64,
}

fn default_fifo_timeout_ms() -> u64 {
    5000
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            fifo_path: None,
            command: Vec::new(),
            fifo_timeout_ms: default_fifo_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from the default path (~/.config/audioshelf/config.toml)
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("audioshelf").join("config.toml"))
    }

    fn app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("audioshelf"))
    }

    /// Get the catalog directory, with CLI override taking precedence
    pub fn data_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        match cli_override.or(self.library.data_dir.as_deref()) {
            Some(dir) => Ok(dir.to_path_buf()),
            None => Ok(Self::app_data_dir()?.join("data")),
        }
    }

    /// Get the decoder pipe path, with CLI override taking precedence
    pub fn fifo_path(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        match cli_override.or(self.decoder.fifo_path.as_deref()) {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(Self::app_data_dir()?.join("fifo")),
        }
    }

    pub fn fifo_timeout(&self) -> Duration {
        Duration::from_millis(self.decoder.fifo_timeout_ms)
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            max_open_files: self.scan.max_open_files,
            batch: BatchSettings {
                threshold: self.scan.batch_threshold,
                poll_interval: Duration::from_millis(self.scan.poll_interval_ms),
            },
            extensions: self.scan.extensions.clone(),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            load_workers: self.library.load_workers,
            failure_policy: self.library.failure_policy,
            ..StoreOptions::default()
        }
    }
}
