//! Source configuration loaded from `sources.toml`.
//!
//! Each configured source names a sport, the adapter kind that syncs it,
//! and a cron schedule. The file is TOML:
//!
//! ```toml
//! [[sources]]
//! sport_id = 1
//! name = "Formula 1"
//! kind = "f1"
//! schedule = "0 */6 * * *"
//! enabled = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

fn default_enabled() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// One configured sport source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Catalog sport id this source populates.
    pub sport_id: i32,

    /// Human-readable name, used in logs and the status API.
    pub name: String,

    /// Adapter kind: f1, formula-e, ufc, ...
    pub kind: String,

    /// Cron schedule (5 or 6 fields).
    pub schedule: String,

    /// Whether this source participates in scheduled syncs.
    ///
    /// Defaults to `true` if not specified.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// IANA timezone applied to events whose feed omits one.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Root of the sources configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Array of source configurations.
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl SourcesConfig {
    /// Returns only enabled sources.
    pub fn enabled_sources(&self) -> Vec<&SourceEntry> {
        self.sources.iter().filter(|s| s.enabled).collect()
    }

    /// Find a source by sport id.
    pub fn find_by_sport(&self, sport_id: i32) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.sport_id == sport_id)
    }
}

/// Default config file name, looked up next to the binary's working dir.
pub const CONFIG_FILE_NAME: &str = "sources.toml";

/// Default config path: `./sources.toml`.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Loads the sources configuration from a TOML file.
///
/// A missing file at the default path yields an empty configuration so the
/// server can start with no sources wired; a missing file at an explicit
/// path is an error.
pub fn load_sources_config(path: Option<PathBuf>) -> Result<SourcesConfig, AppError> {
    let using_default_path = path.is_none();
    let config_path = path.unwrap_or_else(default_config_path);

    if !config_path.exists() {
        if using_default_path {
            return Ok(SourcesConfig::default());
        }
        return Err(AppError::ConfigError(format!(
            "config file not found: {}",
            config_path.display()
        )));
    }

    parse_sources_config(&config_path)
}

fn parse_sources_config(path: &Path) -> Result<SourcesConfig, AppError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
    let config: SourcesConfig = toml::from_str(&contents)
        .map_err(|e| AppError::ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;

    for entry in &config.sources {
        if entry.schedule.trim().is_empty() {
            return Err(AppError::ConfigError(format!(
                "source '{}' has an empty schedule",
                entry.name
            )));
        }
    }
    Ok(config)
}
