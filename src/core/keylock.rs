//! Per-key async mutual exclusion.
//!
//! Every (person, project, date) gets its own `tokio::sync::Mutex`; events for
//! different keys never wait on each other. Entries are created on demand and
//! removed when the last holder releases them.

use crate::models::RecordKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<RecordKey, Slot>>,
}

/// Held while a key is being reconciled. Dropping it releases the key.
pub struct KeyGuard<'a> {
    owner: &'a KeyLocks,
    key: RecordKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free, then hold it.
    pub async fn lock(&self, key: &RecordKey) -> KeyGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            slots.entry(key.clone()).or_default().clone()
        };

        let guard = slot.lock_owned().await;

        KeyGuard {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.owner.slots.lock().unwrap_or_else(|p| p.into_inner());

        // release first, then check whether someone else still references the slot
        self.guard.take();

        if let Some(slot) = slots.get(&self.key)
            && Arc::strong_count(slot) == 1
        {
            slots.remove(&self.key);
        }
    }
}
