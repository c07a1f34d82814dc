// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CheckflowError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CheckflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_cache_dir(cfg)
}

fn validate_cache_dir(cfg: &RawConfigFile) -> Result<()> {
    let Some(dir) = cfg.config.cache_dir.as_ref() else {
        return Ok(());
    };

    if dir.as_os_str().is_empty() {
        return Err(CheckflowError::ConfigError(
            "[config].cache_dir must not be empty".to_string(),
        ));
    }
    if dir.is_file() {
        return Err(CheckflowError::ConfigError(format!(
            "[config].cache_dir points at a regular file: {:?}",
            dir
        )));
    }
    Ok(())
}
