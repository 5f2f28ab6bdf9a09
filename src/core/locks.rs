//! Per-key async locks.
//!
//! Reservation commits are serialized per table and cart mutations per user. The
//! guard is held across the whole database transaction, which closes the gap between
//! the conflict query and the insert.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A registry of mutexes created on first use for each key.
#[derive(Debug)]
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Waits for exclusive access to `key`. Access ends when the guard is dropped.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        // The map shard must not stay borrowed while awaiting the mutex.
        let mutex = Arc::clone(self.locks.entry(key).or_default().value());
        mutex.lock_owned().await
    }

    /// Number of keys seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no key has been locked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<i64>::new());
        let guard = locks.lock(1).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
            })
        };

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        let joined = tokio::time::timeout(Duration::from_secs(1), contender).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::<String>::new();
        let _first = locks.lock("alice".to_string()).await;
        let _second = locks.lock("bob".to_string()).await;
        assert_eq!(locks.len(), 2);
    }
}
