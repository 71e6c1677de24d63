//! Per-key fill guards.
//!
//! Concurrent cold requests for the same cache key queue on one guard; the
//! first holder fills the entry and later holders find it already cached.

use resizr_cache::CacheKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<CacheKey, Weak<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive fill rights on `key`.
    pub async fn acquire(&self, key: &CacheKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|_, slot| slot.strong_count() > 0);
            match slots.get(key).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(AsyncMutex::new(()));
                    slots.insert(key.clone(), Arc::downgrade(&slot));
                    slot
                }
            }
        };
        slot.lock_owned().await
    }

    /// Number of keys with a live guard or waiter.
    pub fn in_flight(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resizr_cache::derive_key;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let key = derive_key("a", ".jpg");

        let guard = locks.acquire(&key).await;
        let waiter = {
            let locks = locks.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.acquire(&derive_key("a", ".jpg")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&derive_key("b", ".jpg")),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_keys_are_forgotten() {
        let locks = KeyLocks::new();
        let key = derive_key("a", ".png");
        {
            let _guard = locks.acquire(&key).await;
            assert_eq!(locks.in_flight(), 1);
        }
        assert_eq!(locks.in_flight(), 0);
    }
}
