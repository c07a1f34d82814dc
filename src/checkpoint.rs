// src/checkpoint.rs

//! Checkpoint cache: the store plus the rules deciding when a stored result
//! may be reused.
//!
//! Every task owns two entries:
//!
//! - `<name>`: the last successful result, tagged [`TAG_RESULTS`], with the
//!   TTL produced by the task's expiration policy.
//! - `<name>_hashes`: a [`CheckpointHashes`] recorded at the same write,
//!   tagged [`TAG_HASHES`], never expiring.
//!
//! A checkpoint is valid only when both entries exist and the stored hashes
//! equal the freshly computed ones.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::hashing::{EMPTY_HASH, HashSource, hash_many, hash_stream};
use crate::store::{FileStore, MemoryStore, Store};

/// Suffix appended to a task name to form its hashes key.
pub const HASH_SUFFIX: &str = "_hashes";

/// Tag carried by result entries; `evict_results` removes exactly these.
pub const TAG_RESULTS: &str = "RESULTS";

/// Tag carried by hashes entries.
pub const TAG_HASHES: &str = "HASHES";

/// Digests describing the conditions a result was produced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointHashes {
    pub script: String,
    pub inputs: String,
}

impl CheckpointHashes {
    /// Hashes for a task with no declared script and no inputs.
    pub fn empty() -> Self {
        Self {
            script: EMPTY_HASH.to_string(),
            inputs: EMPTY_HASH.to_string(),
        }
    }
}

/// Rough classification of a stored value, for inspection output.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn hashes_key(task: &str) -> String {
    format!("{task}{HASH_SUFFIX}")
}

#[derive(Debug)]
pub struct CheckpointCache {
    store: Box<dyn Store>,
    fs: Arc<dyn FileSystem>,
    location: Option<PathBuf>,
}

impl CheckpointCache {
    pub fn new(store: Box<dyn Store>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            store,
            fs,
            location: None,
        }
    }

    /// Open the persistent cache stored under `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let store = FileStore::open(&dir)?;
        Ok(Self {
            store: Box::new(store),
            fs: Arc::new(RealFileSystem),
            location: Some(dir),
        })
    }

    /// A cache that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()), Arc::new(RealFileSystem))
    }

    /// Replace the filesystem used to read script and input sources.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Directory of the backing store, when it lives on disk.
    pub fn location(&self) -> Option<&PathBuf> {
        self.location.as_ref()
    }

    /// Compute fresh hashes for a script source and input list.
    ///
    /// An absent script or an absent input list hashes to the empty string.
    pub fn fingerprint(
        &self,
        script: Option<&HashSource>,
        inputs: Option<&[HashSource]>,
    ) -> CheckpointHashes {
        let script = script
            .map(|s| hash_stream(self.fs.as_ref(), s))
            .unwrap_or_else(|| EMPTY_HASH.to_string());
        let inputs = inputs
            .map(|i| hash_many(self.fs.as_ref(), i))
            .unwrap_or_else(|| EMPTY_HASH.to_string());
        CheckpointHashes { script, inputs }
    }

    /// Whether `task` has a result that may be reused under `current` hashes.
    pub fn is_valid(&self, task: &str, current: &CheckpointHashes) -> Result<bool> {
        if self.store.get(task)?.is_none() {
            debug!(task = %task, "no cached result");
            return Ok(false);
        }

        let Some(stored) = self.stored_hashes(task)? else {
            debug!(task = %task, "cached result has no hashes entry");
            return Ok(false);
        };

        let valid = stored == *current;
        if !valid {
            debug!(
                task = %task,
                script_changed = stored.script != current.script,
                inputs_changed = stored.inputs != current.inputs,
                "cached result is stale"
            );
        }
        Ok(valid)
    }

    pub fn get(&self, task: &str) -> Result<Option<Value>> {
        self.store.get(task)
    }

    /// The hashes recorded with `task`'s last result.
    ///
    /// An entry that does not deserialize as hashes is treated as missing.
    pub fn stored_hashes(&self, task: &str) -> Result<Option<CheckpointHashes>> {
        let Some(raw) = self.store.get(&hashes_key(task))? else {
            return Ok(None);
        };
        match serde_json::from_value(raw) {
            Ok(hashes) => Ok(Some(hashes)),
            Err(err) => {
                warn!(task = %task, error = %err, "ignoring malformed hashes entry");
                Ok(None)
            }
        }
    }

    /// Write `result` and its hashes; both are written before returning.
    pub fn store(
        &mut self,
        task: &str,
        result: &Value,
        hashes: &CheckpointHashes,
        ttl: Option<i64>,
    ) -> Result<()> {
        self.store
            .set(task, result.clone(), ttl, Some(TAG_RESULTS))?;
        self.store.set(
            &hashes_key(task),
            serde_json::to_value(hashes)?,
            None,
            Some(TAG_HASHES),
        )?;
        debug!(task = %task, ttl = ?ttl, "stored checkpoint");
        Ok(())
    }

    /// Remove every result entry; hashes entries are kept.
    pub fn evict_results(&mut self) -> Result<usize> {
        let removed = self.store.evict(TAG_RESULTS)?;
        info!(removed, "evicted cached results");
        Ok(removed)
    }

    /// Remove `task`'s result and hashes. Returns whether a result existed.
    pub fn delete(&mut self, task: &str) -> Result<bool> {
        let had_result = self.store.delete(task)?;
        self.store.delete(&hashes_key(task))?;
        Ok(had_result)
    }

    pub fn clear(&mut self) -> Result<usize> {
        self.store.clear()
    }

    /// All live keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.store.keys()
    }

    /// Keys holding a real result (not ending in the hash suffix).
    pub fn result_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|k| !k.ends_with(HASH_SUFFIX))
            .collect())
    }

    /// Result keys whose stored value is null.
    pub fn null_result_keys(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for key in self.result_keys()? {
            if matches!(self.store.get(&key)?, Some(Value::Null)) {
                out.push(key);
            }
        }
        Ok(out)
    }

    /// `(key, kind of stored value)` for every live key.
    pub fn inspect(&self) -> Result<Vec<(String, &'static str)>> {
        let mut out = Vec::new();
        for key in self.store.keys()? {
            if let Some(value) = self.store.get(&key)? {
                out.push((key, value_kind(&value)));
            }
        }
        Ok(out)
    }

    /// Distinct tags in use, sorted.
    pub fn tags(&self) -> Result<Vec<String>> {
        let mut tags = BTreeSet::new();
        for key in self.store.keys()? {
            if let Some(tag) = self.store.tag_of(&key)? {
                tags.insert(tag);
            }
        }
        Ok(tags.into_iter().collect())
    }
}
