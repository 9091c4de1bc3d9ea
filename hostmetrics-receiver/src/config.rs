//! Configuration for the host metrics receiver.

use hostmetrics_common::{Format, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::filter::FilterConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Collection interval in seconds (default: 10).
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    /// How batches are written out.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Enabled scrapers.
    #[serde(default)]
    pub scrapers: ScrapersConfig,
}

fn default_collection_interval() -> u64 {
    10
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Batch encoding: "json" (default) or "cbor".
    #[serde(default)]
    pub format: Format,
}

/// Per-domain scraper sections. An absent section disables that scraper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapersConfig {
    #[serde(default)]
    pub cpu: Option<CpuConfig>,

    #[serde(default)]
    pub disk: Option<DiskConfig>,

    #[serde(default)]
    pub paging: Option<PagingConfig>,

    #[serde(default)]
    pub load: Option<LoadConfig>,

    #[serde(default)]
    pub process: Option<ProcessConfig>,
}

impl ScrapersConfig {
    pub fn enabled_count(&self) -> usize {
        [
            self.cpu.is_some(),
            self.disk.is_some(),
            self.paging.is_some(),
            self.load.is_some(),
            self.process.is_some(),
        ]
        .into_iter()
        .filter(|enabled| *enabled)
        .count()
    }
}

/// Which counter source a scraper reads from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Platform default (direct readers).
    #[default]
    Auto,
    /// Direct OS counter readers.
    Direct,
    /// Performance-counter categories.
    PerfCounters,
}

/// CPU scraper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Report each CPU separately instead of the aggregate (default: true).
    #[serde(default = "default_true")]
    pub per_cpu: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self { per_cpu: true }
    }
}

fn default_true() -> bool {
    true
}

/// Disk scraper settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Only include these devices (absent or empty = include all).
    #[serde(default)]
    pub include: Option<FilterConfig>,

    /// Exclude these devices.
    #[serde(default)]
    pub exclude: Option<FilterConfig>,
}

/// Paging scraper settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default)]
    pub backend: Backend,
}

/// Load scraper settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Divide load averages by the number of logical CPUs.
    #[serde(default)]
    pub cpu_average: bool,
}

/// Process scraper settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Only include processes with these executable names.
    #[serde(default)]
    pub include: Option<FilterConfig>,

    /// Exclude processes with these executable names.
    #[serde(default)]
    pub exclude: Option<FilterConfig>,

    /// Don't report processes whose executable can't be read as errors.
    #[serde(default)]
    pub mute_process_name_error: bool,
}

impl ReceiverConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ReceiverConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "collection_interval_secs must be > 0".to_string(),
            ));
        }

        if self.scrapers.enabled_count() == 0 {
            return Err(ConfigError::Validation(
                "At least one scraper must be enabled".to_string(),
            ));
        }

        Ok(())
    }
}
