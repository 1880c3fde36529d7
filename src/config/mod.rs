// src/config/mod.rs

use crate::error::ConfigError;
use crate::history::state_key;
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// API key shipped in the sample config; a tick is a no-op until it is replaced.
pub const UNCONFIGURED_API_KEY: &str = "xxxxxx";

/// Where a dataset's data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    /// Spreadsheet (`.xls` / `.xlsx`) converted to CSV.
    Xls,
    /// SQL query result exported to CSV.
    Sql,
    /// File uploaded as is.
    Raw,
}

/// One source → portal resource mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetConfig {
    pub title: String,
    pub source_type: SourceType,
    pub path: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default, rename = "days", alias = "minIntervalDays")]
    pub min_interval_days: u32,
    #[serde(alias = "datasetKey")]
    pub resource_key: String,
    #[serde(default, rename = "append", alias = "appendMode")]
    pub append_mode: bool,
    #[serde(default)]
    pub use_bom: bool,
    #[serde(default)]
    pub push_after_config_change: bool,
}

/// Top-level `pusher.yml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRoot {
    pub api_key: String,
    pub root_url: String,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub configs: Vec<DatasetConfig>,
}

impl ConfigRoot {
    /// Parse a YAML document and validate it.
    pub fn from_yaml(path: &Path, yaml: &str) -> Result<Self, ConfigError> {
        let root: ConfigRoot =
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        root.validate()?;
        Ok(root)
    }

    /// True while the sample API key is still in place.
    pub fn is_unconfigured(&self) -> bool {
        self.api_key.trim() == UNCONFIGURED_API_KEY
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for cfg in &self.configs {
            if cfg.title.trim().is_empty() {
                return Err(ConfigError::EmptyTitle);
            }
            let key = state_key(&cfg.title);
            if let Some(first) = seen.insert(key.clone(), &cfg.title) {
                return Err(ConfigError::DuplicateTitle {
                    first: first.to_string(),
                    second: cfg.title.clone(),
                    state_file: key,
                });
            }
        }
        Ok(())
    }
}

/// Read and parse the config file. Called at the start of every tick so
/// edits are picked up without a restart.
pub fn load(path: &Path) -> Result<ConfigRoot, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ConfigRoot::from_yaml(path, &yaml)
}

/// Last modification time of the config file, in local time.
pub fn modified_at(path: &Path) -> Result<DateTime<Local>, ConfigError> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified))
}
