use crate::services::PollSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub poll_interval_secs: u64,
    pub default_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let database_url = crate::paths::data_dir()
            .map(|dir| format!("sqlite:{}", dir.join("ssis_runner.db").display()))
            .unwrap_or_else(|_| "sqlite:ssis_runner.db".to_string());
        Self {
            database_url,
            host: "127.0.0.1".to_string(),
            port: 6702,
            poll_interval_secs: 2,
            default_timeout_secs: 300,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(file_config) = Self::from_conf_file()? {
            config.apply_file(file_config);
        }

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().unwrap_or(6702);
        }

        if let Ok(interval) = std::env::var("SSIS_POLL_INTERVAL_SECS") {
            config.poll_interval_secs = interval
                .parse()
                .with_context(|| format!("Invalid SSIS_POLL_INTERVAL_SECS '{}'", interval))?;
        }

        if let Ok(timeout) = std::env::var("SSIS_DEFAULT_TIMEOUT_SECS") {
            config.default_timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid SSIS_DEFAULT_TIMEOUT_SECS '{}'", timeout))?;
        }

        config.validate()?;
        config.normalize_database_url()?;
        Ok(config)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            default_timeout: Duration::from_secs(self.default_timeout_secs),
        }
    }

    fn from_conf_file() -> Result<Option<FileConfig>> {
        let path = crate::paths::conf_dir()?.join("config.json");
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_conf_file(&path).map(Some)
    }

    fn read_conf_file(path: &Path) -> Result<FileConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file_config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(file_config)
    }

    fn apply_file(&mut self, file_config: FileConfig) {
        if let Some(database_url) = file_config.database_url {
            self.database_url = database_url;
        }
        if let Some(host) = file_config.host {
            self.host = host;
        }
        if let Some(port) = file_config.port {
            self.port = port;
        }
        if let Some(interval) = file_config.poll_interval_secs {
            self.poll_interval_secs = interval;
        }
        if let Some(timeout) = file_config.default_timeout_secs {
            self.default_timeout_secs = timeout;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }
        if self.default_timeout_secs < self.poll_interval_secs {
            anyhow::bail!("default_timeout_secs cannot be shorter than poll_interval_secs");
        }
        Ok(())
    }

    fn normalize_database_url(&mut self) -> Result<()> {
        let Some(path_str) = self.database_url.strip_prefix("sqlite:") else {
            return Ok(());
        };
        if path_str.starts_with(':') {
            return Ok(());
        }

        let path = Path::new(path_str);
        if path.is_absolute() {
            return Ok(());
        }

        if path
            .components()
            .any(|component| matches!(component, std::path::Component::ParentDir))
        {
            anyhow::bail!("SQLite database path cannot contain '..'");
        }

        let root = crate::paths::install_root()?;
        let absolute = root.join(path);
        self.database_url = format!("sqlite:{}", absolute.display());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    database_url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    poll_interval_secs: Option<u64>,
    default_timeout_secs: Option<u64>,
}
