// src/expire/deferred.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Lists {
    on_complete: Vec<String>,
    after_session: Vec<String>,
}

/// Checkpoint deletions that happen outside the TTL mechanism.
///
/// Each pipeline owns one registry; `after_session` and `on_complete`
/// policies register task names into it. Clones share the same lists.
///
/// - on-complete names are deleted by the pipeline's post-run cleanup, after
///   every `execute`.
/// - after-session names are handed to the process-wide teardown list when
///   the pipeline is built, and deleted by
///   [`end_session`](crate::pipeline::end_session).
#[derive(Debug, Clone, Default)]
pub struct DeferredDeletions {
    inner: Arc<Mutex<Lists>>,
}

impl DeferredDeletions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_on_complete(&self, task: &str) {
        push_unique(&mut self.lock().on_complete, task);
    }

    pub fn register_after_session(&self, task: &str) {
        push_unique(&mut self.lock().after_session, task);
    }

    /// Task names whose checkpoints are deleted when a run completes.
    pub fn on_complete(&self) -> Vec<String> {
        self.lock().on_complete.clone()
    }

    /// Task names whose checkpoints are deleted when the session ends.
    pub fn after_session(&self) -> Vec<String> {
        self.lock().after_session.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Lists> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn push_unique(list: &mut Vec<String>, task: &str) {
    if !list.iter().any(|t| t == task) {
        list.push(task.to_string());
    }
}
