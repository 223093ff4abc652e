use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::module::search::CacheFallback;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub reference: ReferenceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub sheets: SheetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// CSV with `kettou` (name) and `url` (image) columns
    #[serde(default = "default_reference_csv")]
    pub csv_path: PathBuf,

    /// JRA schedule CSV for the `schedule` command
    #[serde(default = "default_schedule_csv")]
    pub schedule_csv: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub fallback: CacheFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub spreadsheet_id: String,

    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Service-account key file, used when GOOGLE_SERVICE_JSON is unset
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_reference_csv() -> PathBuf {
    PathBuf::from("data/umamusume.csv")
}

fn default_schedule_csv() -> PathBuf {
    PathBuf::from("data/jra_schedule.csv")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

fn default_request_delay_ms() -> u64 {
    1200
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sheet_name() -> String {
    "cache".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            reference: ReferenceConfig::default(),
            cache: CacheConfig::default(),
            scrape: ScrapeConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            csv_path: default_reference_csv(),
            schedule_csv: default_schedule_csv(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            fallback: CacheFallback::default(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spreadsheet_id: String::new(),
            sheet_name: default_sheet_name(),
            credentials_path: None,
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BackendConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Read `path`, or fall back to defaults when it does not exist.
    /// A file that exists but does not parse is an error.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file {}: {}", path.display(), e))
    }
}

impl ScrapeConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
