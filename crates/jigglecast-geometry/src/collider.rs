//! Runtime collider geometry consumed by the physics side.
//!
//! `ColliderData` owns a shared vertex array, a per-index copy of the hull
//! points, the index array, and a derived triangle-index-vertex array that
//! mesh collision routines walk. The derived array is rebuilt whenever the
//! source buffers change and on every clone; a move simply carries it along.

use std::mem;
use std::sync::Arc;

use crate::error::{GeometryError, GeometryResult};
use crate::point::{Aabb, MeshPoint};
use crate::storage::ColliderDataStorage;

/// Triangle-index-vertex view over a `ColliderData`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriVertexArray {
    triangles: Vec<[u32; 3]>,
    num_vertices: u32,
    bounds: Option<Aabb>,
}

impl TriVertexArray {
    fn build(vertices: &[MeshPoint], indices: &[u32], num_triangles: u32) -> Self {
        let triangles = indices
            .chunks_exact(3)
            .take(num_triangles as usize)
            .map(|t| [t[0], t[1], t[2]])
            .collect();

        Self {
            triangles,
            num_vertices: vertices.len() as u32,
            bounds: Aabb::from_points(vertices),
        }
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn num_vertices(&self) -> u32 {
        self.num_vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Bounds of the indexed vertex array, `None` when empty.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Resolve triangle `i` against `vertices`.
    pub fn triangle(&self, vertices: &[MeshPoint], i: usize) -> Option<[MeshPoint; 3]> {
        let t = self.triangles.get(i)?;
        Some([
            *vertices.get(t[0] as usize)?,
            *vertices.get(t[1] as usize)?,
            *vertices.get(t[2] as usize)?,
        ])
    }

    fn size_bytes(&self) -> usize {
        mem::size_of::<Self>() + self.triangles.capacity() * mem::size_of::<[u32; 3]>()
    }
}

/// Convex-hull geometry handed to the physics engine.
#[derive(Debug)]
pub struct ColliderData {
    vertices: Arc<[MeshPoint]>,
    hull_points: Vec<MeshPoint>,
    indices: Vec<u32>,

    num_vertices: u32,
    num_triangles: u32,
    num_indices: u32,

    tri_vertex_array: Option<TriVertexArray>,
    size: Option<usize>,
}

impl Default for ColliderData {
    fn default() -> Self {
        Self::empty()
    }
}

impl ColliderData {
    pub fn empty() -> Self {
        Self {
            vertices: Arc::from(Vec::new()),
            hull_points: Vec::new(),
            indices: Vec::new(),
            num_vertices: 0,
            num_triangles: 0,
            num_indices: 0,
            tri_vertex_array: None,
            size: None,
        }
    }

    /// Build from a vertex array and a triangle index list.
    ///
    /// Fails with `InvalidGeometry` if the index count is not a multiple of
    /// three or any index falls outside `vertices`.
    pub fn from_parts(vertices: Arc<[MeshPoint]>, indices: Vec<u32>) -> GeometryResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(GeometryError::invalid(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }

        let hull_points = indices
            .iter()
            .map(|&i| {
                vertices.get(i as usize).copied().ok_or_else(|| {
                    GeometryError::invalid(format!(
                        "index {} out of range ({} vertices)",
                        i,
                        vertices.len()
                    ))
                })
            })
            .collect::<GeometryResult<Vec<_>>>()?;

        let mut data = Self {
            num_vertices: vertices.len() as u32,
            num_triangles: (indices.len() / 3) as u32,
            num_indices: indices.len() as u32,
            vertices,
            hull_points,
            indices,
            tri_vertex_array: None,
            size: None,
        };

        data.generate_tri_vertex_array();

        Ok(data)
    }

    /// Copy a storage record's raw mesh (vertices and indices, no hull).
    pub fn from_storage(storage: &ColliderDataStorage) -> GeometryResult<Self> {
        storage.validate()?;
        Self::from_parts(storage.vertices.clone(), storage.indices.clone())
    }

    /// Rebuild the triangle-index-vertex array from the current buffers.
    pub fn generate_tri_vertex_array(&mut self) {
        self.tri_vertex_array = Some(TriVertexArray::build(
            &self.vertices,
            &self.indices,
            self.num_triangles,
        ));
        self.size = None;
    }

    /// Recompute and cache the byte estimate.
    ///
    /// `ignore_vertex` leaves the shared vertex array out of the total, for
    /// callers that already account for it elsewhere.
    pub fn update_size(&mut self, ignore_vertex: bool) -> usize {
        let size = self.compute_size(ignore_vertex);
        self.size = Some(size);
        size
    }

    /// Byte estimate without touching the cached value.
    pub fn compute_size(&self, ignore_vertex: bool) -> usize {
        let mut size = mem::size_of::<Self>()
            + self.hull_points.capacity() * mem::size_of::<MeshPoint>()
            + self.indices.capacity() * mem::size_of::<u32>();

        if !ignore_vertex {
            size += self.vertices.len() * mem::size_of::<MeshPoint>();
        }

        if let Some(tva) = &self.tri_vertex_array {
            size += tva.size_bytes();
        }

        size
    }

    /// Last value computed by `update_size`, cleared on regeneration.
    pub fn cached_size(&self) -> Option<usize> {
        self.size
    }

    pub fn invalidate_size(&mut self) {
        self.size = None;
    }

    pub fn vertices(&self) -> &Arc<[MeshPoint]> {
        &self.vertices
    }

    pub fn hull_points(&self) -> &[MeshPoint] {
        &self.hull_points
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn num_vertices(&self) -> u32 {
        self.num_vertices
    }

    pub fn num_triangles(&self) -> u32 {
        self.num_triangles
    }

    pub fn num_indices(&self) -> u32 {
        self.num_indices
    }

    pub fn tri_vertex_array(&self) -> Option<&TriVertexArray> {
        self.tri_vertex_array.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.num_indices == 0
    }
}

impl Clone for ColliderData {
    /// The vertex array stays shared; hull points and indices are duplicated
    /// and the triangle array is regenerated.
    fn clone(&self) -> Self {
        let mut data = Self {
            vertices: Arc::clone(&self.vertices),
            hull_points: self.hull_points.clone(),
            indices: self.indices.clone(),
            num_vertices: self.num_vertices,
            num_triangles: self.num_triangles,
            num_indices: self.num_indices,
            tri_vertex_array: None,
            size: None,
        };
        data.generate_tri_vertex_array();
        data
    }
}
