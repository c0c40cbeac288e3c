//! The bone-cast service: cache, disk and live extraction behind one lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jigglecast_geometry::{build_collider, update_geometry, ColliderData, ColliderDataStoragePair};

use crate::config::BoneCastSettings;
use crate::node::NodeConfig;

use super::cache::{BoneCacheUpdateId, BoneCastCache, CacheEntry};
use super::error::{BoneCastError, BoneCastResult};
use super::handle::ObjectHandle;
use super::io::BoneCastIo;
use super::source::{get_geometry, MeshSource};

/// Geometry handed to a collider builder.
#[derive(Debug, Clone)]
pub struct BoneResult {
    pub data: Arc<ColliderData>,
    pub update_id: BoneCacheUpdateId,
}

impl BoneResult {
    fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            data: Arc::clone(entry.data.runtime()),
            update_id: entry.update_id(),
        }
    }
}

/// State guarded by the service lock.
#[derive(Debug)]
pub struct BoneCastShared {
    pub cache: BoneCastCache,
    pub io: BoneCastIo,
    last_error: Option<BoneCastError>,
}

/// One per process; owned by the host and shared by reference or `Arc`.
pub struct BoneCast<S> {
    source: S,
    shared: Mutex<BoneCastShared>,
}

impl<S: MeshSource> BoneCast<S> {
    pub fn new(source: S, settings: &BoneCastSettings) -> Self {
        let max = usize::try_from(settings.max_cache_bytes).unwrap_or(usize::MAX);
        Self::with_parts(
            source,
            BoneCastCache::new(max),
            BoneCastIo::new(&settings.data_dir, settings.compress),
        )
    }

    pub fn with_parts(source: S, cache: BoneCastCache, io: BoneCastIo) -> Self {
        Self {
            source,
            shared: Mutex::new(BoneCastShared {
                cache,
                io,
                last_error: None,
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The single lock around the cache and disk.
    ///
    /// Hold it across a check-then-insert sequence done by hand.
    pub fn lock(&self) -> MutexGuard<'_, BoneCastShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plain cache lookup, no loading or regeneration.
    pub fn get_cached(&self, handle: ObjectHandle, node: &str, read_only: bool) -> Option<BoneResult> {
        let mut shared = self.lock();
        shared
            .cache
            .get(handle, node, read_only)
            .map(BoneResult::from_entry)
    }

    /// Collider for `node`, loading or generating it as needed.
    ///
    /// Returns `None` on failure; see [`last_error`](Self::last_error).
    pub fn get(&self, handle: ObjectHandle, node: &str, config: &NodeConfig) -> Option<BoneResult> {
        let mut shared = self.lock();
        match self.get_locked(&mut shared, handle, node, config) {
            Ok(result) => Some(result),
            Err(e) => {
                log::debug!("[bonecast] [{}] get '{}' failed: {}", handle, node, e);
                shared.last_error = Some(e);
                None
            }
        }
    }

    pub fn try_get(&self, handle: ObjectHandle, node: &str, config: &NodeConfig) -> BoneCastResult<BoneResult> {
        let mut shared = self.lock();
        self.get_locked(&mut shared, handle, node, config)
    }

    fn get_locked(
        &self,
        shared: &mut BoneCastShared,
        handle: ObjectHandle,
        node: &str,
        config: &NodeConfig,
    ) -> BoneCastResult<BoneResult> {
        if !config.bone_cast {
            return Err(BoneCastError::Disabled(node.to_string()));
        }

        let params = config.generation_params();
        params.validate()?;
        let max = shared.cache.max_size();

        if let Some(entry) = shared.cache.get_mut(handle, node) {
            if !entry.data.matches(&params) {
                // stale: rebuild from the cached source geometry
                let data = build_collider(&entry.data, &params)?;
                entry.data.set_runtime(data, &params);
                entry.mark_updated();
                let size = shared.cache.update_size(handle, node).unwrap_or(0);
                shared.cache.evict_overflow();
                // a regenerated entry may have grown past the budget
                if !shared.cache.contains(handle, node) {
                    return Err(BoneCastError::TooLarge { size, max });
                }
            }
        } else {
            let pair = self.load_or_extract(shared, handle, node, config)?;
            let size = pair.size();
            if shared.cache.add(handle, node, pair).is_none() {
                return Err(BoneCastError::TooLarge { size, max });
            }
        }

        let entry = shared.cache.peek(handle, node).ok_or(BoneCastError::NoGeometry {
            handle,
            node: node.to_string(),
        })?;

        if entry.data.runtime().is_empty() {
            return Err(BoneCastError::EmptyCollider {
                handle,
                node: node.to_string(),
            });
        }

        Ok(BoneResult::from_entry(entry))
    }

    /// Disk first, then the live mesh. The returned pair is generated.
    fn load_or_extract(
        &self,
        shared: &mut BoneCastShared,
        handle: ObjectHandle,
        node: &str,
        config: &NodeConfig,
    ) -> BoneCastResult<ColliderDataStoragePair> {
        let params = config.generation_params();
        let content = self.source.content_source(handle);

        if let Some(content) = &content {
            if let Some(mut pair) = shared.io.read(content, node) {
                match update_geometry(&mut pair, &params) {
                    Ok(()) => return Ok(pair),
                    Err(e) => log::warn!(
                        "[bonecast] [{}] cached geometry for '{}' unusable: {}",
                        handle,
                        node,
                        e
                    ),
                }
            }
        }

        let mut pair = self.sample(handle, node, config)?;

        if let Some(content) = &content {
            if shared.io.write(content, node, &pair) {
                pair.mark_persisted();
            } else {
                log_write_failure(shared, handle, node);
            }
        }

        Ok(pair)
    }

    /// Extract from the live mesh and generate; touches no shared state.
    fn sample(&self, handle: ObjectHandle, node: &str, config: &NodeConfig) -> BoneCastResult<ColliderDataStoragePair> {
        let storage = get_geometry(&self.source, handle, node, &config.shape).ok_or_else(|| {
            BoneCastError::NoGeometry {
                handle,
                node: node.to_string(),
            }
        })?;

        let mut pair = ColliderDataStoragePair::from_storage(storage);
        update_geometry(&mut pair, &config.generation_params())?;
        Ok(pair)
    }

    /// Re-extract and regenerate unconditionally, replacing the entry.
    ///
    /// On failure the existing entry is left as it was.
    pub fn update(&self, handle: ObjectHandle, node: &str, config: &NodeConfig) -> bool {
        let mut shared = self.lock();
        match self.update_locked(&mut shared, handle, node, config) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("[bonecast] [{}] update '{}' failed: {}", handle, node, e);
                shared.last_error = Some(e);
                false
            }
        }
    }

    pub fn try_update(&self, handle: ObjectHandle, node: &str, config: &NodeConfig) -> BoneCastResult<()> {
        let mut shared = self.lock();
        self.update_locked(&mut shared, handle, node, config)
    }

    fn update_locked(
        &self,
        shared: &mut BoneCastShared,
        handle: ObjectHandle,
        node: &str,
        config: &NodeConfig,
    ) -> BoneCastResult<()> {
        let mut pair = self.sample(handle, node, config)?;

        if let Some(content) = self.source.content_source(handle) {
            if shared.io.write(&content, node, &pair) {
                pair.mark_persisted();
            } else {
                log_write_failure(shared, handle, node);
            }
        }

        let max = shared.cache.max_size();
        let size = pair.size();
        match shared.cache.add(handle, node, pair) {
            Some(_) => Ok(()),
            None => Err(BoneCastError::TooLarge { size, max }),
        }
    }

    pub fn remove(&self, handle: ObjectHandle, node: &str) -> bool {
        self.lock().cache.remove(handle, node)
    }

    /// Drop every cached entry. Files on disk stay.
    pub fn release(&self) {
        self.lock().cache.release();
    }

    /// Bytes currently held by the cache.
    pub fn cache_size(&self) -> usize {
        self.lock().cache.size()
    }

    /// Message of the last failed `get` or `update`.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.as_ref().map(ToString::to_string)
    }
}

fn log_write_failure(shared: &BoneCastShared, handle: ObjectHandle, node: &str) {
    if let Some(e) = shared.io.last_error() {
        log::error!("[bonecast-io] [{}] write failed [{}]: {}", handle, node, e);
    }
}
