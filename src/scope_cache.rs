use crate::{DynSvc, Key, Scope, Svc, WeakDynSvc};
use parking_lot::{Condvar, Mutex};
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    thread::{self, ThreadId},
};

/// Marks a service as being constructed. Threads other than the builder wait
/// on the slot until construction either publishes a value or fails.
pub(crate) struct BuildSlot {
    thread: ThreadId,
    done: Mutex<bool>,
    finished: Condvar,
}

impl BuildSlot {
    fn new() -> Self {
        BuildSlot {
            thread: thread::current().id(),
            done: Mutex::new(false),
            finished: Condvar::new(),
        }
    }

    /// Whether the slot was opened by the calling thread. A thread meeting
    /// its own slot is re-entering a construction that has not returned yet.
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.thread == thread::current().id()
    }

    /// Blocks until the slot is finished.
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.finished.wait(&mut done);
        }
    }

    /// Wakes every thread waiting on this slot.
    pub fn finish(&self) {
        *self.done.lock() = true;
        self.finished.notify_all();
    }
}

enum CacheEntry {
    Building(Svc<BuildSlot>),
    Ready(DynSvc),
    Weak(WeakDynSvc),
}

/// The state of a key in the cache.
pub(crate) enum CacheLookup {
    Ready(DynSvc),
    Building(Svc<BuildSlot>),
    Vacant,
}

/// Instances built from the definitions of one container.
#[derive(Default)]
pub(crate) struct ScopeCache {
    entries: HashMap<Key, CacheEntry>,
}

impl ScopeCache {
    /// Looks up a key, dropping weak entries whose instance is gone.
    pub fn lookup(&mut self, key: &Key) -> CacheLookup {
        let lookup = match self.entries.get(key) {
            None => return CacheLookup::Vacant,
            Some(CacheEntry::Ready(value)) => CacheLookup::Ready(value.clone()),
            Some(CacheEntry::Building(slot)) => {
                CacheLookup::Building(slot.clone())
            }
            Some(CacheEntry::Weak(value)) => match value.upgrade() {
                Some(value) => CacheLookup::Ready(value),
                None => CacheLookup::Vacant,
            },
        };

        if let CacheLookup::Vacant = lookup {
            self.entries.remove(key);
        }
        lookup
    }

    /// Gets a live instance for a key without touching building markers.
    pub fn ready(&self, key: &Key) -> Option<DynSvc> {
        match self.entries.get(key)? {
            CacheEntry::Ready(value) => Some(value.clone()),
            CacheEntry::Weak(value) => value.upgrade(),
            CacheEntry::Building(_) => None,
        }
    }

    /// Marks a key as being built by the calling thread.
    pub fn begin(&mut self, key: Key) -> Svc<BuildSlot> {
        let slot = Svc::new(BuildSlot::new());
        self.entries.insert(key, CacheEntry::Building(slot.clone()));
        slot
    }

    /// Replaces the building marker opened by `slot` with the built value,
    /// stored according to its scope. Stores nothing and returns `false`
    /// when the marker is gone, which happens when the definition was
    /// replaced or the container reset while the value was being built.
    pub fn publish(
        &mut self,
        key: Key,
        slot: &Svc<BuildSlot>,
        scope: Scope,
        value: &DynSvc,
    ) -> bool {
        if !self.is_marked_by(&key, slot) {
            return false;
        }

        match scope {
            Scope::Transient | Scope::ObjectGraph => {
                self.entries.remove(&key);
            }
            Scope::Shared => {
                self.entries.insert(key, CacheEntry::Ready(value.clone()));
            }
            Scope::WeakSingleton => {
                let value = Svc::downgrade(value);
                self.entries.insert(key, CacheEntry::Weak(value));
            }
        }
        true
    }

    /// Removes the building marker opened by `slot` after a failed
    /// construction.
    pub fn abandon(&mut self, key: &Key, slot: &Svc<BuildSlot>) {
        if self.is_marked_by(key, slot) {
            self.entries.remove(key);
        }
    }

    fn is_marked_by(&self, key: &Key, slot: &Svc<BuildSlot>) -> bool {
        matches!(
            self.entries.get(key),
            Some(CacheEntry::Building(marker)) if Svc::ptr_eq(marker, slot)
        )
    }

    /// Forgets whatever is stored for a key. A live instance is handed back
    /// so the caller can drop it once the container lock is released.
    pub fn remove(&mut self, key: &Key) -> Option<DynSvc> {
        match self.entries.remove(key)? {
            CacheEntry::Ready(value) => Some(value),
            CacheEntry::Weak(value) => value.upgrade(),
            CacheEntry::Building(_) => None,
        }
    }

    /// Removes a published value, but only if it is still the given
    /// instance.
    pub fn evict(&mut self, key: &Key, value: &DynSvc) {
        let target = Svc::as_ptr(value).cast::<()>();
        let matches = match self.entries.get(key) {
            Some(CacheEntry::Ready(cached)) => {
                Svc::as_ptr(cached).cast::<()>() == target
            }
            Some(CacheEntry::Weak(cached)) => {
                cached.as_ptr().cast::<()>() == target
            }
            _ => false,
        };
        if matches {
            self.entries.remove(key);
        }
    }
}

impl Debug for ScopeCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, entry)| {
                let state = match entry {
                    CacheEntry::Building(_) => "building",
                    CacheEntry::Ready(_) => "ready",
                    CacheEntry::Weak(value) if value.strong_count() > 0 => {
                        "ready (weak)"
                    }
                    CacheEntry::Weak(_) => "released",
                };
                (key, state)
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceInfo;
    use std::time::Duration;

    fn key() -> Key {
        Key::new(ServiceInfo::of::<u8>(), None, Vec::new())
    }

    #[test]
    fn shared_values_stay_cached() {
        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());
        assert!(matches!(cache.lookup(&key()), CacheLookup::Building(_)));

        let value: DynSvc = Svc::new(1_u8);
        assert!(cache.publish(key(), &slot, Scope::Shared, &value));
        slot.finish();
        drop(value);

        assert!(matches!(cache.lookup(&key()), CacheLookup::Ready(_)));
    }

    #[test]
    fn weak_values_are_dropped_once_released() {
        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());

        let value: DynSvc = Svc::new(1_u8);
        cache.publish(key(), &slot, Scope::WeakSingleton, &value);
        assert!(cache.ready(&key()).is_some());

        drop(value);
        assert!(cache.ready(&key()).is_none());
        assert!(matches!(cache.lookup(&key()), CacheLookup::Vacant));
    }

    #[test]
    fn object_graph_values_are_not_kept() {
        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());

        let value: DynSvc = Svc::new(1_u8);
        assert!(cache.publish(key(), &slot, Scope::ObjectGraph, &value));
        assert!(matches!(cache.lookup(&key()), CacheLookup::Vacant));
    }

    #[test]
    fn only_the_current_marker_publishes() {
        let mut cache = ScopeCache::default();
        let stale = cache.begin(key());
        assert!(cache.remove(&key()).is_none());
        let current = cache.begin(key());

        let value: DynSvc = Svc::new(1_u8);
        assert!(!cache.publish(key(), &stale, Scope::Shared, &value));
        cache.abandon(&key(), &stale);
        assert!(matches!(cache.lookup(&key()), CacheLookup::Building(_)));

        assert!(cache.publish(key(), &current, Scope::Shared, &value));
        assert!(cache.ready(&key()).is_some());
    }

    #[test]
    fn abandon_only_removes_building_markers() {
        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());
        let value: DynSvc = Svc::new(1_u8);
        cache.publish(key(), &slot, Scope::Shared, &value);

        cache.abandon(&key(), &slot);
        assert!(cache.ready(&key()).is_some());

        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());
        cache.abandon(&key(), &slot);
        assert!(matches!(cache.lookup(&key()), CacheLookup::Vacant));
    }

    #[test]
    fn remove_hands_back_live_instances() {
        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());
        let value: DynSvc = Svc::new(1_u8);
        cache.publish(key(), &slot, Scope::Shared, &value);

        let removed = cache.remove(&key()).unwrap();
        assert!(Svc::ptr_eq(&value, &removed));
        assert!(cache.ready(&key()).is_none());
        assert!(cache.remove(&key()).is_none());
    }

    #[test]
    fn evict_ignores_other_instances() {
        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());
        let value: DynSvc = Svc::new(1_u8);
        let other: DynSvc = Svc::new(1_u8);
        cache.publish(key(), &slot, Scope::Shared, &value);

        cache.evict(&key(), &other);
        assert!(cache.ready(&key()).is_some());

        cache.evict(&key(), &value);
        assert!(cache.ready(&key()).is_none());
    }

    #[test]
    fn waiters_are_released_when_the_slot_finishes() {
        let mut cache = ScopeCache::default();
        let slot = cache.begin(key());
        assert!(slot.is_owned_by_current_thread());

        let waiter = {
            let slot = slot.clone();
            std::thread::spawn(move || {
                assert!(!slot.is_owned_by_current_thread());
                slot.wait();
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        slot.finish();
        waiter.join().unwrap();
    }
}
