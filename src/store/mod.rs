// src/store/mod.rs

//! Persistent key-value storage underneath the checkpoint cache.
//!
//! - [`Store`] is the narrow contract the engine relies on: get, set with an
//!   optional TTL and tag, delete, delete-by-tag, clear and key enumeration.
//! - [`FileStore`] keeps one JSON document per pipeline directory and
//!   survives process restarts.
//! - [`MemoryStore`] keeps everything in memory (lost on drop); tests and
//!   throwaway pipelines use it.

pub mod file;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

pub use file::{FileStore, STORE_FILE_NAME};
pub use memory::MemoryStore;

/// Abstract storage for checkpoint entries.
///
/// Expired entries behave exactly like missing ones for every operation.
pub trait Store: Send + Debug {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or replace `key`.
    ///
    /// `ttl` is in seconds from now; `None` never expires and a value `<= 0`
    /// is already expired.
    fn set(&mut self, key: &str, value: Value, ttl: Option<i64>, tag: Option<&str>) -> Result<()>;

    /// Returns whether a live entry was removed.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// Remove every entry carrying `tag`; returns how many were removed.
    fn evict(&mut self, tag: &str) -> Result<usize>;

    fn clear(&mut self) -> Result<usize>;

    /// Live keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;

    fn tag_of(&self, key: &str) -> Result<Option<String>>;
}

/// One stored value plus its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Unix timestamp (seconds) at which the entry stops being visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl StoredEntry {
    pub fn new(value: Value, ttl: Option<i64>, tag: Option<&str>, now: i64) -> Self {
        Self {
            value,
            tag: tag.map(str::to_string),
            expires_at: ttl.map(|secs| now.saturating_add(secs)),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Entry table shared by both backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct EntryMap {
    entries: BTreeMap<String, StoredEntry>,
}

impl EntryMap {
    pub(crate) fn get(&self, key: &str) -> Option<&StoredEntry> {
        let now = unix_now();
        self.entries.get(key).filter(|e| !e.is_expired(now))
    }

    pub(crate) fn set(&mut self, key: &str, value: Value, ttl: Option<i64>, tag: Option<&str>) {
        let entry = StoredEntry::new(value, ttl, tag, unix_now());
        self.entries.insert(key.to_string(), entry);
    }

    pub(crate) fn delete(&mut self, key: &str) -> bool {
        let now = unix_now();
        self.entries
            .remove(key)
            .is_some_and(|e| !e.is_expired(now))
    }

    /// Returns how many live entries were removed.
    pub(crate) fn evict(&mut self, tag: &str) -> usize {
        let now = unix_now();
        let mut removed = 0;
        self.entries.retain(|_, e| {
            let hit = e.tag.as_deref() == Some(tag);
            if hit && !e.is_expired(now) {
                removed += 1;
            }
            !hit
        });
        removed
    }

    pub(crate) fn clear(&mut self) -> usize {
        let n = self.keys().len();
        self.entries.clear();
        n
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let now = unix_now();
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Drop expired entries; returns whether anything was removed.
    pub(crate) fn purge_expired(&mut self) -> bool {
        let now = unix_now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before != self.entries.len()
    }
}

pub(crate) fn unix_now() -> i64 {
    Utc::now().timestamp()
}
