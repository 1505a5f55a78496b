//! Usage profile cache keyed by item, window and store generation.
//!
//! Each key owns a `OnceCell`, so concurrent requests for the same key wait
//! on a single computation instead of racing. Stored profiles are shared
//! behind `Arc` and never mutated.
//!
//! Keys carry the store generation the records were read at. A request that
//! read its records before an upload can only fill a slot for the old
//! generation, which later requests never look up.
//!
//! Failed computations leave nothing behind: the empty slot is removed and
//! the next caller retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tokio::sync::OnceCell;

use crate::model::UsageProfile;

/// Default bound on the number of slots.
const DEFAULT_CAPACITY: usize = 1024;

/// Cache key: item, inclusive analysis window and data generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub item_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub generation: u64,
}

type Slot = Arc<OnceCell<Arc<UsageProfile>>>;

#[derive(Debug)]
pub struct ProfileCache {
    slots: Mutex<HashMap<ProfileKey, Slot>>,
    capacity: usize,
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` slots (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Return the cached profile for `key`, computing it at most once.
    ///
    /// # Errors
    ///
    /// Whatever `compute` fails with. The failure is not cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: ProfileKey,
        compute: F,
    ) -> Result<Arc<UsageProfile>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<UsageProfile, E>>,
    {
        let slot = self.slot(&key);

        let result = slot
            .get_or_try_init(|| async move { compute().await.map(Arc::new) })
            .await
            .cloned();

        if result.is_err() {
            self.discard_empty(&key, &slot);
        }
        result
    }

    /// Drop every entry. Used when the underlying records change.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of keys with a stored profile.
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &ProfileKey) -> Slot {
        let mut slots = self.lock();

        if !slots.contains_key(key) && slots.len() >= self.capacity {
            // Older generations are unreachable; drop them before anything else.
            slots.retain(|k, slot| k.generation >= key.generation && slot.initialized());
            if slots.len() >= self.capacity {
                slots.clear();
            }
        }

        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn discard_empty(&self, key: &ProfileKey, slot: &Slot) {
        let mut slots = self.lock();
        let same_empty_slot = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if same_empty_slot {
            slots.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProfileKey, Slot>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
