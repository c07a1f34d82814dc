// src/pipeline/session.rs

//! Process-wide teardown of `after_session` checkpoints.
//!
//! A pipeline backed by a disk store hands its after-session task names to
//! this list when it is built, keyed by store directory. Nothing is deleted
//! when a pipeline is dropped, so a later pipeline in the same process can
//! still reuse those checkpoints. [`end_session`] deletes everything on the
//! list once, right before the process exits.
//!
//! In-memory pipelines never register: their store dies with them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointCache;

type Teardown = BTreeMap<PathBuf, BTreeSet<String>>;

static TEARDOWN: Mutex<Teardown> = Mutex::new(BTreeMap::new());

fn teardown() -> MutexGuard<'static, Teardown> {
    TEARDOWN.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn register(dir: &Path, tasks: Vec<String>) {
    if tasks.is_empty() {
        return;
    }
    debug!(store = ?dir, tasks = ?tasks, "registered after-session deletions");
    teardown()
        .entry(dir.to_path_buf())
        .or_default()
        .extend(tasks);
}

/// Store directories with the task names awaiting [`end_session`].
pub fn pending_deletions() -> Vec<(PathBuf, Vec<String>)> {
    teardown()
        .iter()
        .map(|(dir, names)| (dir.clone(), names.iter().cloned().collect()))
        .collect()
}

/// Delete every checkpoint registered with `after_session` in this process.
///
/// Call once before exiting. The list is emptied, so a second call does
/// nothing. Failures are logged and skipped. Returns how many results were
/// deleted.
pub fn end_session() -> usize {
    let pending = std::mem::take(&mut *teardown());
    let mut deleted = 0;

    for (dir, names) in pending {
        let mut cache = match CheckpointCache::open(&dir) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(store = ?dir, error = %err, "cannot open store for session teardown");
                continue;
            }
        };
        for name in names {
            match cache.delete(&name) {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(task = %name, store = ?dir, error = %err, "cannot delete checkpoint")
                }
            }
        }
    }

    if deleted > 0 {
        info!(deleted, "ended session");
    }
    deleted
}
