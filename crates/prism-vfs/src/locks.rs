use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per path.
///
/// Every read-modify-write of a node happens under that node's guard, so two
/// tasks linking children into the same directory cannot lose an update.
/// Guards are always acquired child before parent. Entries are never pruned;
/// the table grows with the number of distinct paths touched.
#[derive(Debug, Default)]
pub(crate) struct PathLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PathLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`.
    pub(crate) async fn lock(&self, path: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = Arc::clone(
            self.locks
                .entry(path.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        mutex.lock_owned().await
    }
}
