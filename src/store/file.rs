// src/store/file.rs

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{CheckflowError, Result};
use crate::store::{EntryMap, Store};

/// Name of the document holding all entries, inside the store directory.
///
/// The effective path on disk is `<dir>/checkpoints.json`, where `<dir>` is
/// usually `<cache_root>/<pipeline name>`.
pub const STORE_FILE_NAME: &str = "checkpoints.json";

/// Stores entries in a JSON file.
///
/// Every operation reads the document afresh and every mutation rewrites it,
/// so two handles on the same directory observe each other's writes. Writes go
/// to a sibling temp file that is then renamed over the previous document.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `dir`.
    ///
    /// Expired entries are purged from disk here.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let store = Self { dir };

        let mut map = store.load()?;
        if map.purge_expired() {
            store.save(&map)?;
        }

        debug!(path = ?store.path(), entries = map.keys().len(), "opened checkpoint store");
        Ok(store)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE_NAME)
    }

    fn load(&self) -> Result<EntryMap> {
        let path = self.path();

        if !path.exists() {
            return Ok(EntryMap::default());
        }

        let contents = fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(EntryMap::default());
        }

        serde_json::from_str(&contents).map_err(|e| {
            CheckflowError::Store(format!("corrupt checkpoint store at {:?}: {e}", path))
        })
    }

    fn save(&self, map: &EntryMap) -> Result<()> {
        let tmp = self.dir.join(format!("{STORE_FILE_NAME}.tmp"));

        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, map)?;
            writer.flush()?;
        }

        fs::rename(&tmp, self.path())?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.get(key).map(|e| e.value.clone()))
    }

    fn set(&mut self, key: &str, value: Value, ttl: Option<i64>, tag: Option<&str>) -> Result<()> {
        let mut map = self.load()?;
        map.set(key, value, ttl, tag);
        self.save(&map)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let mut map = self.load()?;
        let removed = map.delete(key);
        self.save(&map)?;
        Ok(removed)
    }

    fn evict(&mut self, tag: &str) -> Result<usize> {
        let mut map = self.load()?;
        let removed = map.evict(tag);
        if removed > 0 {
            self.save(&map)?;
            info!(tag = %tag, removed, "evicted tagged entries (file)");
        }
        Ok(removed)
    }

    fn clear(&mut self) -> Result<usize> {
        let mut map = self.load()?;
        let removed = map.clear();
        self.save(&map)?;
        info!(removed, "cleared checkpoint store (file)");
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.load()?.keys())
    }

    fn tag_of(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).and_then(|e| e.tag.clone()))
    }
}
