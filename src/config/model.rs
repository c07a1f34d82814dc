// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// cache_dir = "/var/cache/checkflow"
/// expire_null_results = true
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Root under which each pipeline keeps `<cache_dir>/<pipeline name>/`.
    ///
    /// When absent, `CHECKFLOW_CACHE_DIR` is consulted, then `~/.checkflow`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Delete cached results whose value is null after every run.
    #[serde(default)]
    pub expire_null_results: bool,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub config: ConfigSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection) -> Self {
        Self { config }
    }
}
