use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// One async mutex per key, created on demand and dropped once nobody holds
/// or waits on it.
pub struct KeyedLocks<K> {
    slots: Slots<K>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: K) -> KeyGuard<K> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            prune(&mut slots);
            slots.entry(key.clone()).or_default().clone()
        };
        let guard = slot.clone().lock_owned().await;

        KeyGuard {
            key,
            slot,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    pub fn active_keys(&self) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        prune(&mut slots);
        slots.len()
    }
}

/// Drops slots only the map still references. A waiter whose `lock()` future
/// was cancelled leaves such a slot behind when the holder released first.
fn prune<K>(slots: &mut HashMap<K, Arc<AsyncMutex<()>>>) {
    slots.retain(|_, slot| Arc::strong_count(slot) > 1);
}

pub struct KeyGuard<K: Eq + Hash> {
    key: K,
    slot: Arc<AsyncMutex<()>>,
    slots: Slots<K>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        // map entry + this guard; anyone else waiting holds another count
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}
