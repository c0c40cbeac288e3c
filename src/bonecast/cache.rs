//! Size-bounded in-memory cache of collider geometry.
//!
//! Entries are keyed by (handle, node). Every `add` re-measures the entry and
//! evicts least-recently-used entries until the total fits the budget.
//! Recency is a per-cache logical clock bumped by `add`, `get_mut` and
//! non-read-only `get`; `peek` and read-only `get` leave it alone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use jigglecast_geometry::ColliderDataStoragePair;
use serde::Serialize;

use super::handle::ObjectHandle;

/// Cache key: live handle plus exact node name.
pub type CacheKey = (ObjectHandle, String);

static NEXT_UPDATE_ID: AtomicU64 = AtomicU64::new(1);

/// Changes whenever an entry's geometry changes.
///
/// Consumers compare IDs to decide whether to rebuild physics shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoneCacheUpdateId {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
}

impl BoneCacheUpdateId {
    pub fn new() -> Self {
        Self {
            id: NEXT_UPDATE_ID.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
        }
    }

    pub fn bump(&mut self) {
        *self = Self::new();
    }
}

impl Default for BoneCacheUpdateId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CacheEntry {
    pub data: ColliderDataStoragePair,
    size: usize,
    last_access: u64,
    update_id: BoneCacheUpdateId,
}

impl CacheEntry {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    pub fn update_id(&self) -> BoneCacheUpdateId {
        self.update_id
    }

    /// Record that `data` changed in place.
    pub fn mark_updated(&mut self) {
        self.update_id.bump();
    }
}

#[derive(Debug)]
pub struct BoneCastCache {
    entries: HashMap<CacheKey, CacheEntry>,
    total_size: usize,
    max_size: usize,
    clock: u64,
}

impl BoneCastCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            total_size: 0,
            max_size,
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up an entry; unless `read_only`, this counts as a use.
    pub fn get(&mut self, handle: ObjectHandle, node: &str, read_only: bool) -> Option<&CacheEntry> {
        if read_only {
            return self.peek(handle, node);
        }
        self.get_mut(handle, node).map(|e| &*e)
    }

    /// Mutable lookup; always counts as a use.
    pub fn get_mut(&mut self, handle: ObjectHandle, node: &str) -> Option<&mut CacheEntry> {
        let now = self.tick();
        let entry = self.entries.get_mut(&(handle, node.to_string()))?;
        entry.last_access = now;
        Some(entry)
    }

    pub fn peek(&self, handle: ObjectHandle, node: &str) -> Option<&CacheEntry> {
        self.entries.get(&(handle, node.to_string()))
    }

    pub fn contains(&self, handle: ObjectHandle, node: &str) -> bool {
        self.peek(handle, node).is_some()
    }

    /// Insert or replace the entry for (handle, node), then evict overflow.
    ///
    /// Returns `None` when the new entry was itself evicted because it does
    /// not fit the budget on its own.
    pub fn add(
        &mut self,
        handle: ObjectHandle,
        node: &str,
        mut data: ColliderDataStoragePair,
    ) -> Option<&CacheEntry> {
        let now = self.tick();
        let key = (handle, node.to_string());
        let size = data.update_size();

        match self.entries.get_mut(&key) {
            Some(entry) => {
                self.total_size -= entry.size;
                entry.data = data;
                entry.size = size;
                entry.last_access = now;
                entry.update_id.bump();
            }
            None => {
                self.entries.insert(
                    key.clone(),
                    CacheEntry {
                        data,
                        size,
                        last_access: now,
                        update_id: BoneCacheUpdateId::new(),
                    },
                );
            }
        }
        self.total_size += size;

        if size > self.max_size {
            log::warn!(
                "[bonecast] [{}] '{}': {} bytes exceeds cache budget of {}",
                handle,
                node,
                size,
                self.max_size
            );
        }

        self.evict_overflow();

        self.entries.get(&key)
    }

    /// Re-measure one entry and fix up the running total.
    pub fn update_size(&mut self, handle: ObjectHandle, node: &str) -> Option<usize> {
        let entry = self.entries.get_mut(&(handle, node.to_string()))?;
        self.total_size -= entry.size;
        entry.size = entry.data.update_size();
        self.total_size += entry.size;
        Some(entry.size)
    }

    pub fn remove(&mut self, handle: ObjectHandle, node: &str) -> bool {
        self.remove_entry(&(handle, node.to_string())).is_some()
    }

    pub fn remove_entry(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.total_size -= entry.size;
        Some(entry)
    }

    /// Drop least-recently-used entries until the total fits. Returns how many went.
    pub fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;

        while self.total_size > self.max_size {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            else {
                break;
            };

            if let Some(entry) = self.remove_entry(&oldest) {
                log::debug!(
                    "[bonecast] evicted [{}] '{}' ({} bytes, total {})",
                    oldest.0,
                    oldest.1,
                    entry.size,
                    self.total_size
                );
                evicted += 1;
            }
        }

        evicted
    }

    /// Change the budget, evicting as needed.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_overflow();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Running total of entry sizes in bytes.
    pub fn size(&self) -> usize {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn release(&mut self) {
        self.entries.clear();
        self.total_size = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &CacheEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jigglecast_geometry::{ColliderDataStorage, MeshPoint};

    /// Pair whose size grows with `n` triangles.
    fn pair(n: u32) -> ColliderDataStoragePair {
        let vertices = (0..n + 2).map(|i| MeshPoint::new(i as f32, 0.0, 0.0)).collect();
        let weights = vec![1.0; (n + 2) as usize];
        let indices = (0..n).flat_map(|i| [i, i + 1, i + 2]).collect();
        ColliderDataStoragePair::from_storage(ColliderDataStorage::new(vertices, weights, indices).unwrap())
    }

    fn size_of(n: u32) -> usize {
        pair(n).size()
    }

    #[test]
    fn test_add_then_get() {
        let mut cache = BoneCastCache::new(usize::MAX);
        let h = ObjectHandle(1);

        cache.add(h, "A", pair(1));
        cache.add(h, "B", pair(2));
        cache.add(ObjectHandle(2), "A", pair(3));

        assert_eq!(cache.get(h, "A", true).unwrap().data.storage.num_triangles, 1);
        assert_eq!(cache.get(h, "B", true).unwrap().data.storage.num_triangles, 2);
        assert_eq!(
            cache.get(ObjectHandle(2), "A", true).unwrap().data.storage.num_triangles,
            3
        );
        assert!(cache.get(h, "a", true).is_none());
        assert_eq!(cache.size(), size_of(1) + size_of(2) + size_of(3));
    }

    #[test]
    fn test_overwrite_replaces_size_and_id() {
        let mut cache = BoneCastCache::new(usize::MAX);
        let h = ObjectHandle(7);

        let first = cache.add(h, "N", pair(1)).unwrap().update_id();
        cache.add(h, "X", pair(1));
        let second = cache.add(h, "N", pair(4)).unwrap();

        assert_ne!(second.update_id(), first);
        assert_eq!(second.size(), size_of(4));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.size(), size_of(4) + size_of(1));

        // overwrite counts as the latest access
        let x = cache.peek(h, "X").unwrap().last_access();
        assert!(cache.peek(h, "N").unwrap().last_access() > x);
    }

    #[test]
    fn test_evicts_oldest_access_first() {
        let each = size_of(2);
        let mut cache = BoneCastCache::new(each * 2);
        let h = ObjectHandle(1);

        cache.add(h, "A", pair(2));
        cache.add(h, "B", pair(2));
        // use A so B becomes the oldest
        assert!(cache.get(h, "A", false).is_some());
        cache.add(h, "C", pair(2));

        assert!(cache.contains(h, "A"));
        assert!(!cache.contains(h, "B"));
        assert!(cache.contains(h, "C"));
        assert!(cache.size() <= cache.max_size());
    }

    #[test]
    fn test_read_only_get_does_not_protect() {
        let each = size_of(2);
        let mut cache = BoneCastCache::new(each * 2);
        let h = ObjectHandle(1);

        cache.add(h, "A", pair(2));
        cache.add(h, "B", pair(2));
        assert!(cache.get(h, "A", true).is_some());
        assert!(cache.peek(h, "A").is_some());
        cache.add(h, "C", pair(2));

        assert!(!cache.contains(h, "A"));
        assert!(cache.contains(h, "B"));
    }

    #[test]
    fn test_oversized_entry_is_evicted() {
        let mut cache = BoneCastCache::new(size_of(1));
        let h = ObjectHandle(1);

        assert!(cache.add(h, "small", pair(1)).is_some());
        assert!(cache.add(h, "big", pair(50)).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_survivors_are_most_recent() {
        let mut cache = BoneCastCache::new(size_of(3) + size_of(1) + size_of(2));
        let h = ObjectHandle(9);
        let sizes = [3, 1, 2, 5, 1, 2];

        for (i, n) in sizes.iter().enumerate() {
            cache.add(h, &i.to_string(), pair(*n));
            assert!(cache.size() <= cache.max_size());
        }

        // walk back from the newest while the running sum fits
        let mut expected = Vec::new();
        let mut sum = 0;
        for (i, n) in sizes.iter().enumerate().rev() {
            sum += size_of(*n);
            if sum > cache.max_size() {
                break;
            }
            expected.push(i.to_string());
        }
        let mut names: Vec<String> = cache.iter().map(|(k, _)| k.1.clone()).collect();
        names.sort();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_remove_release_and_budget() {
        let mut cache = BoneCastCache::new(usize::MAX);
        let h = ObjectHandle(3);
        cache.add(h, "A", pair(1));
        cache.add(h, "B", pair(1));

        assert!(cache.remove(h, "A"));
        assert!(!cache.remove(h, "A"));
        assert_eq!(cache.size(), size_of(1));

        cache.add(h, "C", pair(1));
        cache.set_max_size(size_of(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(h, "C"));

        cache.release();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_update_size_tracks_in_place_changes() {
        let mut cache = BoneCastCache::new(usize::MAX);
        let h = ObjectHandle(1);
        cache.add(h, "A", pair(1));

        cache.get_mut(h, "A").unwrap().data = pair(6);
        assert_eq!(cache.update_size(h, "A"), Some(size_of(6)));
        assert_eq!(cache.size(), size_of(6));
        assert_eq!(cache.update_size(h, "missing"), None);
    }
}
