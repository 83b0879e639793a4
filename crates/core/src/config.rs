use crate::error::{Result, WeftError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const GAME_VERSION_ENV: &str = "WEFT_GAME_VERSION";
pub const MAPPINGS_DIR_ENV: &str = "WEFT_MAPPINGS_DIR";
pub const LOG_DIR_ENV: &str = "WEFT_LOG_DIR";
pub const LOG_LEVEL_ENV: &str = "WEFT_LOG_LEVEL";

/// Settings of one framework context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeftConfig {
    /// Active game version. Without one, names are used as they are.
    pub game_version: Option<String>,
    /// Directory holding `<version>.json` mapping files.
    pub mappings_dir: PathBuf,
    /// Package prefix of generated adapter names.
    pub adapter_namespace: String,
    pub adapter_cache_capacity: usize,
    /// Log file directory, `$HOME/.weft/logs` when unset.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for WeftConfig {
    fn default() -> Self {
        Self {
            game_version: None,
            mappings_dir: PathBuf::from("mappings"),
            adapter_namespace: "weft.generated".to_string(),
            adapter_cache_capacity: 64,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl WeftConfig {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let config: WeftConfig = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies `WEFT_*` overrides from an arbitrary variable source.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(version) = lookup(GAME_VERSION_ENV).filter(|v| !v.is_empty()) {
            self.game_version = Some(version);
        }
        if let Some(dir) = lookup(MAPPINGS_DIR_ENV).filter(|v| !v.is_empty()) {
            self.mappings_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(LOG_DIR_ENV).filter(|v| !v.is_empty()) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
        self
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            let home = std::env::var_os("HOME").unwrap_or_else(|| ".".into());
            PathBuf::from(home).join(".weft").join("logs")
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.adapter_namespace.is_empty() {
            return Err(WeftError::Config("adapter_namespace must not be empty".into()));
        }
        if self.adapter_namespace.contains(['/', ' ', ';']) {
            return Err(WeftError::Config(format!(
                "adapter_namespace {:?} is not a package name",
                self.adapter_namespace
            )));
        }
        Ok(())
    }
}
