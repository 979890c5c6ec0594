use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use compcreds::DEFAULT_COMP_CRED_PATH;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/compcreds/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Override for data directory (encrypted store).
    pub data_dir: Option<PathBuf>,
    /// Root key path credentials are stored under.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Where the data key lives in the OS keyring.
    #[serde(default)]
    pub keyring: KeyringConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyringConfig {
    pub service: String,
    pub account: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            root_path: default_root_path(),
            keyring: KeyringConfig::default(),
        }
    }
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            service: "compcreds".to_string(),
            account: "data-key".to_string(),
        }
    }
}

fn default_root_path() -> String {
    DEFAULT_COMP_CRED_PATH.to_string()
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("compcreds").join("config.toml"))
}

/// Write the given config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_if_missing(config, &default_path()?)
}

/// Write `config` to `path`, creating parent directories as needed.
/// An existing file is left untouched so user edits are never clobbered.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
