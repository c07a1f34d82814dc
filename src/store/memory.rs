// src/store/memory.rs

use serde_json::Value;

use crate::errors::Result;
use crate::store::{EntryMap, Store};

/// Stores entries in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: EntryMap,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.map.get(key).map(|e| e.value.clone()))
    }

    fn set(&mut self, key: &str, value: Value, ttl: Option<i64>, tag: Option<&str>) -> Result<()> {
        self.map.set(key, value, ttl, tag);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        Ok(self.map.delete(key))
    }

    fn evict(&mut self, tag: &str) -> Result<usize> {
        Ok(self.map.evict(tag))
    }

    fn clear(&mut self) -> Result<usize> {
        Ok(self.map.clear())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.map.keys())
    }

    fn tag_of(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).and_then(|e| e.tag.clone()))
    }
}
