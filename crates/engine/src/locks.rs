use brokersync_data::TokenKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per credential key.
///
/// Serializes the read-check-refresh-write sequence for a single
/// (user, broker) pair while leaving other keys independent. Entries nobody
/// holds or waits on are dropped on the next `lock` call.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<TokenKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: TokenKey) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key).or_default().clone()
        };
        entry.lock_owned().await
    }

    /// Number of keys currently held or waited on.
    pub async fn active(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
