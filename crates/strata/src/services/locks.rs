use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type ArtifactKey = (String, String);

/// Per-artifact write locks.
///
/// Every write to an artifact runs while holding the guard for its (workspace, id),
/// so two writers in this process can never compute the same next version. Entries
/// nobody holds or waits on are pruned on the next acquire.
#[derive(Debug, Default)]
pub struct ArtifactLocks {
    locks: Mutex<HashMap<ArtifactKey, Arc<AsyncMutex<()>>>>,
}

impl ArtifactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to one artifact
    pub async fn acquire(&self, workspace: &str, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((workspace.to_string(), id.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of artifacts with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
