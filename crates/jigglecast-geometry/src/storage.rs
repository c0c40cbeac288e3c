//! Persistable geometry and the storage/runtime pair kept per cache entry.

use std::mem;
use std::sync::Arc;

use crate::collider::ColliderData;
use crate::error::{GeometryError, GeometryResult};
use crate::point::MeshPoint;

/// Weighted source geometry as extracted from a skinned mesh.
///
/// One weight per vertex; `indices.len() == 3 * num_triangles`.
#[derive(Debug, Clone)]
pub struct ColliderDataStorage {
    pub vertices: Arc<[MeshPoint]>,
    pub weights: Vec<f32>,
    pub indices: Vec<u32>,
    pub num_triangles: u32,
    pub num_vertices: u32,
}

impl Default for ColliderDataStorage {
    fn default() -> Self {
        Self {
            vertices: Arc::from(Vec::new()),
            weights: Vec::new(),
            indices: Vec::new(),
            num_triangles: 0,
            num_vertices: 0,
        }
    }
}

impl ColliderDataStorage {
    /// Build and validate a storage record.
    pub fn new(vertices: Vec<MeshPoint>, weights: Vec<f32>, indices: Vec<u32>) -> GeometryResult<Self> {
        let storage = Self {
            num_vertices: vertices.len() as u32,
            num_triangles: (indices.len() / 3) as u32,
            vertices: Arc::from(vertices),
            weights,
            indices,
        };
        storage.validate()?;
        Ok(storage)
    }

    /// Check that every buffer agrees with its count and all indices are in range.
    pub fn validate(&self) -> GeometryResult<()> {
        if self.vertices.len() != self.num_vertices as usize {
            return Err(GeometryError::invalid(format!(
                "vertex array holds {} points, count says {}",
                self.vertices.len(),
                self.num_vertices
            )));
        }
        if self.weights.len() != self.num_vertices as usize {
            return Err(GeometryError::invalid(format!(
                "weight array holds {} values, expected {}",
                self.weights.len(),
                self.num_vertices
            )));
        }
        if self.indices.len() != 3 * self.num_triangles as usize {
            return Err(GeometryError::invalid(format!(
                "index array holds {} indices, expected 3 * {}",
                self.indices.len(),
                self.num_triangles
            )));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i >= self.num_vertices) {
            return Err(GeometryError::invalid(format!(
                "index {} out of range ({} vertices)",
                bad, self.num_vertices
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.num_vertices == 0
    }

    pub fn size_bytes(&self) -> usize {
        mem::size_of::<Self>()
            + self.vertices.len() * mem::size_of::<MeshPoint>()
            + self.weights.capacity() * mem::size_of::<f32>()
            + self.indices.capacity() * mem::size_of::<u32>()
    }
}

/// Parameters that drive regeneration of the runtime half.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub weight_threshold: f32,
    pub simplify_target: f32,
    pub simplify_target_error: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            weight_threshold: 0.0,
            simplify_target: 1.0,
            simplify_target_error: 0.02,
        }
    }
}

impl GenerationParams {
    /// Every parameter must be finite.
    pub fn validate(&self) -> GeometryResult<()> {
        let fields = [
            ("weight_threshold", self.weight_threshold),
            ("simplify_target", self.simplify_target),
            ("simplify_target_error", self.simplify_target_error),
        ];
        match fields.into_iter().find(|(_, v)| !v.is_finite()) {
            Some((name, value)) => Err(GeometryError::InvalidParams { name, value }),
            None => Ok(()),
        }
    }
}

/// Parameters the runtime half was last generated with.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GenerationMeta {
    pub weight_threshold: f32,
    pub simplify_target: f32,
    pub simplify_target_error: f32,
    /// Set once the runtime half reflects these parameters.
    pub generated: bool,
    /// The storage half was read from or written to disk, not only sampled.
    pub persisted: bool,
}

impl GenerationMeta {
    pub fn matches(&self, params: &GenerationParams) -> bool {
        self.generated
            && self.weight_threshold == params.weight_threshold
            && self.simplify_target == params.simplify_target
            && self.simplify_target_error == params.simplify_target_error
    }

    pub fn apply(&mut self, params: &GenerationParams) {
        self.weight_threshold = params.weight_threshold;
        self.simplify_target = params.simplify_target;
        self.simplify_target_error = params.simplify_target_error;
        self.generated = true;
    }
}

/// Source geometry plus the hull derived from it.
///
/// Only `storage` is persisted; `runtime` is always regenerated from it.
#[derive(Debug, Clone, Default)]
pub struct ColliderDataStoragePair {
    pub storage: ColliderDataStorage,
    runtime: Arc<ColliderData>,
    meta: GenerationMeta,
    vertices_shared: bool,
    size: usize,
}

impl ColliderDataStoragePair {
    /// Pair with an empty runtime half, as produced by a disk load or a fresh extraction.
    pub fn from_storage(storage: ColliderDataStorage) -> Self {
        let mut pair = Self {
            storage,
            ..Default::default()
        };
        pair.update_size();
        pair
    }

    pub fn runtime(&self) -> &Arc<ColliderData> {
        &self.runtime
    }

    pub fn meta(&self) -> &GenerationMeta {
        &self.meta
    }

    /// True when the runtime half was generated with exactly `params`.
    pub fn matches(&self, params: &GenerationParams) -> bool {
        self.meta.matches(params)
    }

    /// Whether the runtime vertex array aliases the storage vertex array.
    pub fn vertices_shared(&self) -> bool {
        self.vertices_shared
    }

    pub fn mark_persisted(&mut self) {
        self.meta.persisted = true;
    }

    /// Replace the runtime half and record the parameters it was built with.
    pub fn set_runtime(&mut self, data: ColliderData, params: &GenerationParams) {
        self.vertices_shared = Arc::ptr_eq(data.vertices(), &self.storage.vertices);
        self.runtime = Arc::new(data);
        self.meta.apply(params);
        self.update_size();
    }

    /// Recompute the byte estimate for both halves.
    pub fn update_size(&mut self) -> usize {
        let ignore_vertex = self.vertices_shared;
        let runtime_size = match Arc::get_mut(&mut self.runtime) {
            Some(data) => data.update_size(ignore_vertex),
            None => self.runtime.compute_size(ignore_vertex),
        };
        self.size = self.storage.size_bytes() + runtime_size;
        self.size
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> ColliderDataStorage {
        ColliderDataStorage::new(
            vec![
                MeshPoint::new(0.0, 0.0, 0.0),
                MeshPoint::new(1.0, 0.0, 0.0),
                MeshPoint::new(1.0, 1.0, 0.0),
                MeshPoint::new(0.0, 1.0, 0.0),
            ],
            vec![1.0, 1.0, 0.5, 0.5],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn test_new_sets_counts() {
        let s = quad();
        assert_eq!(s.num_vertices, 4);
        assert_eq!(s.num_triangles, 2);
        assert!(!s.is_empty());
    }

    #[test]
    fn test_validate_rejects_mismatches() {
        let v = vec![MeshPoint::default(); 3];
        assert!(ColliderDataStorage::new(v.clone(), vec![1.0; 2], vec![0, 1, 2]).is_err());
        assert!(ColliderDataStorage::new(v.clone(), vec![1.0; 3], vec![0, 1, 3]).is_err());
        assert!(ColliderDataStorage::new(v, vec![1.0; 3], vec![0, 1]).is_err());

        let mut s = quad();
        s.num_triangles = 3;
        assert!(matches!(s.validate(), Err(GeometryError::InvalidGeometry(_))));
    }

    #[test]
    fn test_meta_matching() {
        let mut pair = ColliderDataStoragePair::from_storage(quad());
        let params = GenerationParams::default();
        assert!(!pair.matches(&params), "ungenerated pair never matches");

        let data = ColliderData::from_storage(&pair.storage).unwrap();
        pair.set_runtime(data, &params);
        assert!(pair.matches(&params));
        assert!(pair.vertices_shared());

        let other = GenerationParams {
            weight_threshold: 0.3,
            ..params
        };
        assert!(!pair.matches(&other));
    }

    #[test]
    fn test_pair_size_excludes_shared_vertices() {
        let storage = quad();
        let mut shared = ColliderDataStoragePair::from_storage(storage.clone());
        let data = ColliderData::from_storage(&storage).unwrap();
        let runtime_full = data.compute_size(false);
        shared.set_runtime(data, &GenerationParams::default());

        assert_eq!(
            shared.size(),
            storage.size_bytes() + runtime_full - 4 * mem::size_of::<MeshPoint>()
        );
    }
}
