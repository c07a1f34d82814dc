// src/config/mod.rs

//! Configuration loading and validation for checkflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and resolve the cache root (`loader.rs`).
//! - Validate the loaded values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    CACHE_DIR_ENV, default_config_path, load_and_validate, load_from_path, pipeline_store_dir,
    resolve_cache_root,
};
pub use model::{ConfigFile, ConfigSection, RawConfigFile};
