use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::Mode;

/// Keys every storage config file must define with a non-empty string value.
const REQUIRED_STORAGE_KEYS: [&str; 3] =
    ["storage_account_name", "storage_account_key", "container_name"];

/// Errors loading local configuration. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Azure config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read Azure config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Azure config {} is not a JSON object: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(
        "Azure config missing required keys: {missing:?} (config has keys: {present:?}). \
         Please check {}",
        path.display()
    )]
    MissingKeys {
        path: PathBuf,
        missing: Vec<String>,
        present: Vec<String>,
    },
}

/// Connection settings for the Azure Storage container photos are copied into.
#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "storage_account_name")]
    pub account_name: String,
    #[serde(rename = "storage_account_key")]
    pub account_key: String,
    pub container_name: String,
    /// Overrides `https://<account>.blob.core.windows.net`.
    #[serde(default)]
    pub blob_endpoint: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("blob_endpoint", &self.blob_endpoint)
            .finish()
    }
}

impl StorageConfig {
    /// Load and validate the storage config file.
    ///
    /// A key whose value is missing, not a string, or empty counts as missing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let map: Map<String, Value> =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let missing: Vec<String> = REQUIRED_STORAGE_KEYS
            .iter()
            .filter(|key| {
                !map.get(**key)
                    .and_then(Value::as_str)
                    .is_some_and(|v| !v.is_empty())
            })
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys {
                path: path.to_path_buf(),
                missing,
                present: map.keys().cloned().collect(),
            });
        }

        let config: StorageConfig =
            serde_json::from_value(Value::Object(map)).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!("Loaded Azure config from {}", path.display());
        Ok(config)
    }
}

/// Runtime configuration derived from the command line.
#[derive(Debug)]
pub struct Config {
    pub token_file: PathBuf,
    pub storage_config: PathBuf,
    pub mode: Mode,
    pub no_progress_bar: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> Self {
        let mode = cli.mode();
        Self {
            token_file: expand_tilde(&cli.token_file),
            storage_config: expand_tilde(&cli.storage_config),
            mode,
            no_progress_bar: cli.no_progress_bar,
        }
    }
}
