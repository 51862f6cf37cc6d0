//! Per-file mutual exclusion.

use parking_lot::Mutex;
use provenance_common_core::FileId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Async locks keyed by file. Different files never contend.
#[derive(Clone, Default)]
pub struct FileLocks {
    inner: Arc<Mutex<HashMap<FileId, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Held while a file's chain is being read and extended. Released on drop.
pub struct FileGuard {
    file_id: FileId,
    _guard: OwnedMutexGuard<()>,
}

impl FileGuard {
    pub fn file_id(&self) -> FileId {
        self.file_id
    }
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, file_id: FileId) -> FileGuard {
        let mutex = {
            let mut map = self.inner.lock();
            // Entries only the map still references are idle.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(file_id).or_default().clone()
        };
        FileGuard {
            file_id,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of files with a live or contended lock.
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .values()
            .filter(|m| Arc::strong_count(m) > 1)
            .count()
    }
}
