// src/config/loader.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile};
use crate::errors::{CheckflowError, Result};

/// Environment variable overriding the cache root when the config sets none.
pub const CACHE_DIR_ENV: &str = "CHECKFLOW_CACHE_DIR";

/// Directory name used under the home directory when nothing else is set.
pub const DEFAULT_CACHE_DIR_NAME: &str = ".checkflow";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for the
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Checkflow.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Checkflow.toml")
}

/// Root directory under which pipeline stores live.
///
/// Priority: `[config].cache_dir`, then `CHECKFLOW_CACHE_DIR`, then
/// `~/.checkflow`.
pub fn resolve_cache_root(section: &ConfigSection) -> Result<PathBuf> {
    if let Some(dir) = section.cache_dir.as_ref() {
        return Ok(dir.clone());
    }
    cache_root_from_env()
}

/// `CHECKFLOW_CACHE_DIR` if set and non-empty, else `~/.checkflow`.
pub fn cache_root_from_env() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CACHE_DIR_NAME))
        .ok_or_else(|| {
            CheckflowError::ConfigError(format!(
                "cannot determine home directory; set {CACHE_DIR_ENV} or [config].cache_dir"
            ))
        })
}

/// Directory holding the store of pipeline `name` under `root`.
pub fn pipeline_store_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}
