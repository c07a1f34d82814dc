// src/hashing.rs

//! Content digests used to decide whether a checkpoint is still valid.
//!
//! Every digest is a lowercase hex SHA-256. A source that cannot be read
//! hashes to [`HASH_ERROR`] instead of failing, so an unreadable input simply
//! never matches a previously stored digest.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::Glob;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::fs::{FileSystem, walk_files};

/// Read size used when folding a stream into a digest.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Digest reported for sources that could not be opened or read.
pub const HASH_ERROR: &str = "HASHERROR";

/// Digest used when a task declares no inputs (or no script).
pub const EMPTY_HASH: &str = "";

/// Something whose bytes participate in a task's script or inputs hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashSource {
    /// A file on disk.
    Path(PathBuf),
    /// An in-memory byte stream.
    Bytes(Arc<[u8]>),
    /// Every file below `root` whose relative path matches `pattern`,
    /// visited in sorted path order.
    Glob { root: PathBuf, pattern: String },
}

impl HashSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        HashSource::Path(path.into())
    }

    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        HashSource::Bytes(Arc::from(bytes.as_ref()))
    }

    pub fn glob(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        HashSource::Glob {
            root: root.into(),
            pattern: pattern.into(),
        }
    }
}

impl From<PathBuf> for HashSource {
    fn from(path: PathBuf) -> Self {
        HashSource::Path(path)
    }
}

impl From<&Path> for HashSource {
    fn from(path: &Path) -> Self {
        HashSource::Path(path.to_path_buf())
    }
}

impl From<&str> for HashSource {
    fn from(path: &str) -> Self {
        HashSource::Path(PathBuf::from(path))
    }
}

/// Fold a reader into a hex digest, `CHUNK_SIZE` bytes at a time.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest a single source.
///
/// Never fails: unreadable sources yield [`HASH_ERROR`]. A glob source is
/// digested as [`hash_many`] over the files it matches.
pub fn hash_stream(fs: &dyn FileSystem, source: &HashSource) -> String {
    match source {
        HashSource::Path(path) => hash_path(fs, path),
        HashSource::Bytes(bytes) => hash_bytes(bytes),
        HashSource::Glob { root, pattern } => match expand_glob(fs, root, pattern) {
            Ok(paths) => {
                let sources: Vec<HashSource> = paths.into_iter().map(HashSource::Path).collect();
                hash_many(fs, &sources)
            }
            Err(err) => {
                warn!(pattern = %pattern, error = %err, "invalid input glob");
                HASH_ERROR.to_string()
            }
        },
    }
}

/// Digest an ordered list of sources.
///
/// Each source's hex digest is concatenated in the given order and the
/// resulting text is digested again, so reordering the sources changes the
/// result.
pub fn hash_many(fs: &dyn FileSystem, sources: &[HashSource]) -> String {
    let mut joined = String::with_capacity(sources.len() * 64);
    for source in sources {
        joined.push_str(&hash_stream(fs, source));
    }
    let hash = hash_bytes(joined.as_bytes());
    debug!(hash = %hash, sources = sources.len(), "computed aggregate hash");
    hash
}

fn hash_path(fs: &dyn FileSystem, path: &Path) -> String {
    let reader = match fs.open_read(path) {
        Ok(r) => r,
        Err(err) => {
            debug!(path = ?path, error = %err, "cannot open file for hashing");
            return HASH_ERROR.to_string();
        }
    };
    match hash_reader(reader) {
        Ok(hash) => hash,
        Err(err) => {
            debug!(path = ?path, error = %err, "cannot read file for hashing");
            HASH_ERROR.to_string()
        }
    }
}

/// Files below `root` whose `/`-separated relative path matches `pattern`.
pub fn expand_glob(
    fs: &dyn FileSystem,
    root: &Path,
    pattern: &str,
) -> Result<Vec<PathBuf>, globset::Error> {
    let matcher = Glob::new(pattern)?.compile_matcher();
    Ok(walk_files(fs, root)
        .into_iter()
        .filter(|path| {
            path.strip_prefix(root)
                .map(|rel| matcher.is_match(rel.to_string_lossy().replace('\\', "/")))
                .unwrap_or(false)
        })
        .collect())
}
