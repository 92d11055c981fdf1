use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

/// PulseDB partner API endpoint and credentials.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    #[serde(default)]
    pub partner: String,
    #[serde(default)]
    pub key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_provider_url(),
            partner: String::new(),
            key: String::new(),
        }
    }
}

fn default_provider_url() -> String {
    "https://api.pulsedb.in".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// AMC names to mirror; matched by case-insensitive containment against
    /// the provider's AMC name.
    #[serde(default = "default_amcs")]
    pub amcs: Vec<String>,
    #[serde(default = "default_sync_limit")]
    pub default_limit: usize,
    /// UTC wall-clock time ("HH:MM") of the daily sync.
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            amcs: default_amcs(),
            default_limit: default_sync_limit(),
            daily_at: default_daily_at(),
        }
    }
}

impl SyncConfig {
    /// Parses `daily_at` into (hour, minute).
    pub fn daily_at_utc(&self) -> Result<(u32, u32)> {
        let (hour, minute) = self
            .daily_at
            .split_once(':')
            .with_context(|| format!("Invalid daily_at time: {}", self.daily_at))?;
        let hour: u32 = hour
            .parse()
            .with_context(|| format!("Invalid daily_at hour: {}", self.daily_at))?;
        let minute: u32 = minute
            .parse()
            .with_context(|| format!("Invalid daily_at minute: {}", self.daily_at))?;
        if hour > 23 || minute > 59 {
            bail!("daily_at out of range: {}", self.daily_at);
        }
        Ok((hour, minute))
    }
}

fn default_amcs() -> Vec<String> {
    ["HDFC", "Axis", "ICICI Prudential", "Nippon", "SBI"]
        .map(String::from)
        .to_vec()
}

fn default_sync_limit() -> usize {
    100
}

fn default_daily_at() -> String {
    // 9 PM IST
    "15:30".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "fundlens")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "codito", "fundlens")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
