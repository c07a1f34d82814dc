// src/pipeline/cleanup.rs

use tracing::{debug, warn};

use crate::pipeline::Pipeline;

impl Pipeline {
    /// Post-run deletions: `on_complete` checkpoints, then null results when
    /// configured. Best effort; errors are logged and swallowed.
    pub(crate) fn cleanup_after_run(&mut self) {
        for name in self.deferred.on_complete() {
            self.delete_best_effort(&name, "on_complete");
        }

        if self.expire_null_results {
            match self.cache.null_result_keys() {
                Ok(keys) => {
                    for key in keys {
                        self.delete_best_effort(&key, "null result");
                    }
                }
                Err(err) => warn!(pipeline = %self.name, error = %err, "cannot list null results"),
            }
        }
    }

    fn delete_best_effort(&mut self, name: &str, reason: &str) {
        match self.cache.delete(name) {
            Ok(true) => debug!(task = %name, reason = %reason, "deleted checkpoint"),
            Ok(false) => {}
            Err(err) => warn!(task = %name, reason = %reason, error = %err, "cannot delete checkpoint"),
        }
    }
}
