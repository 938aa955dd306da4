use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::indexing::client::DEFAULT_BASE_URL;
use crate::indexing::reconcile::DEFAULT_UPLOAD_CONCURRENCY;
use crate::indexing::scanner::DEFAULT_SCAN_CONCURRENCY;
use crate::indexing::scheduler::{DEFAULT_INTERVAL_HOURS, DEFAULT_RETRY_DELAY_SECS};

pub const DEFAULT_PORT: u16 = 3001;
pub const CONFIG_FILE_NAME: &str = "notebook-server.toml";

/// Environment variables read under their historical names.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "port"),
    ("LOCAL_FOLDER", "folder"),
    ("GMN_BASE_URL", "indexing.base_url"),
    ("GMN_INDEXING_KEY", "indexing.api_key"),
    ("GMN_PROVIDER_ID", "indexing.provider_id"),
    ("GMN_LAST_FULL_INDEX", "indexing.last_full_index"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub folder: PathBuf,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    pub indexing: IndexingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Defaults to on whenever an API key is configured.
    #[serde(default)]
    pub enabled: Option<bool>,
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    pub interval_hours: i64,
    pub retry_delay_secs: i64,
    pub upload_concurrency: usize,
    pub scan_concurrency: usize,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub last_full_index: Option<DateTime<Utc>>,
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub folder: Option<PathBuf>,
    pub port: Option<u16>,
}

impl ServerConfig {
    /// Defaults, then the TOML file, then `NOTEBOOK__*` and legacy
    /// environment variables, then command-line values.
    pub fn load(options: &LoadOptions) -> Result<Self> {
        Self::load_from(options, None)
    }

    pub fn load_from(options: &LoadOptions, env: Option<HashMap<String, String>>) -> Result<Self> {
        let lookup = |key: &str| match &env {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        };

        let mut builder = Config::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("indexing.base_url", DEFAULT_BASE_URL)?
            .set_default("indexing.interval_hours", DEFAULT_INTERVAL_HOURS)?
            .set_default("indexing.retry_delay_secs", DEFAULT_RETRY_DELAY_SECS)?
            .set_default("indexing.upload_concurrency", DEFAULT_UPLOAD_CONCURRENCY as i64)?
            .set_default("indexing.scan_concurrency", DEFAULT_SCAN_CONCURRENCY as i64)?
            .set_default("indexing.request_timeout_secs", 60i64)?;

        match &options.config_path {
            Some(path) => {
                builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
            }
            None => {
                if let Some(path) = default_config_path() {
                    builder = builder.add_source(
                        File::from(path.as_path())
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("NOTEBOOK")
                .prefix_separator("__")
                .separator("__")
                .source(env.clone()),
        );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, lookup(*var))?;
        }

        builder = builder
            .set_override_option(
                "folder",
                options.folder.as_ref().map(|f| f.to_string_lossy().to_string()),
            )?
            .set_override_option("port", options.port.map(i64::from))?;

        let mut config: ServerConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        if !self.folder.is_dir() {
            bail!("Folder {} does not exist", self.folder.display());
        }
        self.folder = self
            .folder
            .canonicalize()
            .with_context(|| format!("Failed to resolve folder {}", self.folder.display()))?;

        if self.indexing.interval_hours <= 0 {
            bail!("indexing.interval_hours must be positive");
        }
        if self.indexing.retry_delay_secs < 0 {
            bail!("indexing.retry_delay_secs must not be negative");
        }
        if self.indexing.upload_concurrency == 0 || self.indexing.scan_concurrency == 0 {
            bail!("indexing concurrency limits must be at least 1");
        }
        Ok(())
    }

    pub fn indexing_enabled(&self) -> bool {
        self.indexing
            .enabled
            .unwrap_or_else(|| self.indexing.api_key.is_some())
    }
}

impl IndexingConfig {
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.interval_hours)
    }

    pub fn retry_delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "gmsnotebook", "notebook-server")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn options_for(config_path: &Path) -> LoadOptions {
        LoadOptions {
            config_path: Some(config_path.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_with_folder_from_legacy_env() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("empty.toml");
        fs::write(&config_path, "").unwrap();
        let folder = dir.path().to_string_lossy().to_string();

        let config = ServerConfig::load_from(&options_for(&config_path), env(&[("LOCAL_FOLDER", &folder)]))
            .unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.folder, dir.path().canonicalize().unwrap());
        assert_eq!(config.indexing.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.indexing.upload_concurrency, 10);
        assert_eq!(config.indexing.interval(), chrono::Duration::hours(12));
        assert!(!config.indexing_enabled());
    }

    #[test]
    fn test_file_then_env_then_cli_precedence() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("server.toml");
        fs::write(
            &config_path,
            format!(
                "port = 4000\nfolder = {:?}\n[indexing]\nupload_concurrency = 3\napi_key = \"from-file\"\n",
                dir.path().to_string_lossy()
            ),
        )
        .unwrap();

        let config = ServerConfig::load_from(
            &options_for(&config_path),
            env(&[("PORT", "5000"), ("GMN_INDEXING_KEY", "from-env")]),
        )
        .unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.indexing.upload_concurrency, 3);
        assert_eq!(config.indexing.api_key.as_deref(), Some("from-env"));
        assert!(config.indexing_enabled());

        let mut options = options_for(&config_path);
        options.port = Some(6000);
        let config = ServerConfig::load_from(&options, env(&[("PORT", "5000")])).unwrap();
        assert_eq!(config.port, 6000);
    }

    #[test]
    fn test_prefixed_env_sets_nested_keys() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("empty.toml");
        fs::write(&config_path, "").unwrap();
        let folder = dir.path().to_string_lossy().to_string();

        let config = ServerConfig::load_from(
            &options_for(&config_path),
            env(&[
                ("LOCAL_FOLDER", &folder),
                ("NOTEBOOK__INDEXING__SCAN_CONCURRENCY", "8"),
            ]),
        )
        .unwrap();
        assert_eq!(config.indexing.scan_concurrency, 8);
    }

    #[test]
    fn test_last_full_index_parsed() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("empty.toml");
        fs::write(&config_path, "").unwrap();
        let folder = dir.path().to_string_lossy().to_string();

        let config = ServerConfig::load_from(
            &options_for(&config_path),
            env(&[
                ("LOCAL_FOLDER", &folder),
                ("GMN_LAST_FULL_INDEX", "2024-03-01T12:00:00Z"),
            ]),
        )
        .unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z").unwrap();
        assert_eq!(config.indexing.last_full_index, Some(expected.with_timezone(&Utc)));
    }

    #[test]
    fn test_missing_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("empty.toml");
        fs::write(&config_path, "").unwrap();
        let missing = dir.path().join("nope").to_string_lossy().to_string();

        let result = ServerConfig::load_from(&options_for(&config_path), env(&[("LOCAL_FOLDER", &missing)]));
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("server.toml");
        fs::write(
            &config_path,
            format!(
                "folder = {:?}\n[indexing]\nupload_concurrency = 0\n",
                dir.path().to_string_lossy()
            ),
        )
        .unwrap();

        assert!(ServerConfig::load_from(&options_for(&config_path), env(&[])).is_err());
    }
}
