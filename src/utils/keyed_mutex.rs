use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// A mutex that allows locking based on a key (e.g., model folder).
/// Unrelated keys never contend.
#[derive(Debug, Clone)]
pub struct KeyedMutex {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Acquires a lock for the given key.
    /// The lock is released when the returned guard is dropped.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        mutex.lock_owned().await
    }

    /// Removes locks that are not currently held by any task.
    pub fn cleanup(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for KeyedMutex {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutual exclusion for reconciliation runs.
///
/// A full sync holds the global lock exclusively. Scoped work holds it shared
/// and additionally locks its model folder, so two scoped runs for different
/// models proceed in parallel while a full sync waits for both.
#[derive(Debug, Clone, Default)]
pub struct SyncLocks {
    global: Arc<RwLock<()>>,
    models: KeyedMutex,
}

pub enum SyncGuard {
    Full {
        _global: OwnedRwLockWriteGuard<()>,
    },
    Model {
        // field order is drop order: release the folder before the global lock
        _model: OwnedMutexGuard<()>,
        _global: OwnedRwLockReadGuard<()>,
    },
}

impl SyncLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_full(&self) -> SyncGuard {
        SyncGuard::Full {
            _global: self.global.clone().write_owned().await,
        }
    }

    pub async fn lock_model(&self, folder: &str) -> SyncGuard {
        let global = self.global.clone().read_owned().await;
        let model = self.models.lock(folder).await;
        self.models.cleanup();
        SyncGuard::Model {
            _model: model,
            _global: global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = KeyedMutex::new();
        let _guard = locks.lock("ModelA").await;
        assert!(
            timeout(Duration::from_millis(50), locks.lock("ModelA"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let locks = KeyedMutex::new();
        let _a = locks.lock("ModelA").await;
        assert!(
            timeout(Duration::from_millis(50), locks.lock("ModelB"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_cleanup_drops_released_entries() {
        let locks = KeyedMutex::new();
        {
            let _a = locks.lock("ModelA").await;
        }
        let _b = locks.lock("ModelB").await;
        locks.cleanup();
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_full_sync_waits_for_scoped_runs() {
        let locks = SyncLocks::new();
        let scoped = locks.lock_model("ModelA").await;
        assert!(
            timeout(Duration::from_millis(50), locks.lock_full())
                .await
                .is_err()
        );
        drop(scoped);
        assert!(
            timeout(Duration::from_millis(50), locks.lock_full())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_scoped_runs_for_different_models_overlap() {
        let locks = SyncLocks::new();
        let _a = locks.lock_model("ModelA").await;
        assert!(
            timeout(Duration::from_millis(50), locks.lock_model("ModelB"))
                .await
                .is_ok()
        );
        assert!(
            timeout(Duration::from_millis(50), locks.lock_model("ModelA"))
                .await
                .is_err()
        );
    }
}
