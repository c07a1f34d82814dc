// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone)]
enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests that hash inputs without touching disk.
///
/// Clones share the same underlying tree, so a test can keep a handle and
/// rewrite file contents between two pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file, implicitly creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            parent = dir.parent();
        }

        entries.insert(path, MockEntry::File(content.into()));
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(entries.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(entries.get(path), Some(MockEntry::Dir))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(entries
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }
}
