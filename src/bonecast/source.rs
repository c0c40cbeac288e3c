//! Live skinned-mesh access and geometry extraction.
//!
//! The host engine implements [`MeshSource`]; everything downstream of
//! [`extract_geometry`] works on engine-independent storage.

use std::collections::HashMap;

use jigglecast_geometry::{ColliderDataStorage, MeshPoint};

use super::handle::{ContentSource, ObjectHandle};

/// Skin-to-bone transform: `scale * (rotation * v) + translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinTransform {
    /// Row-major 3x3 rotation.
    pub rotation: [[f32; 3]; 3],
    pub translation: [f32; 3],
    pub scale: f32,
}

impl Default for SkinTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SkinTransform {
    pub const IDENTITY: Self = Self {
        rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        translation: [0.0; 3],
        scale: 1.0,
    };

    pub fn apply(&self, p: MeshPoint) -> MeshPoint {
        let v = p.to_array();
        let r = &self.rotation;
        let row = |i: usize| r[i][0] * v[0] + r[i][1] * v[1] + r[i][2] * v[2];
        MeshPoint::new(
            self.scale * row(0) + self.translation[0],
            self.scale * row(1) + self.translation[1],
            self.scale * row(2) + self.translation[2],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

/// One bone influencing a shape.
#[derive(Debug, Clone, Default)]
pub struct BoneBinding {
    pub name: String,
    pub skin_to_bone: SkinTransform,
    pub weights: Vec<VertexWeight>,
}

/// A skinned shape as the engine exposes it.
#[derive(Debug, Clone, Default)]
pub struct SkinnedShape {
    pub name: String,
    pub vertices: Vec<MeshPoint>,
    /// Triangle lists, one per skin partition.
    pub partitions: Vec<Vec<[u32; 3]>>,
    pub bones: Vec<BoneBinding>,
}

/// Which part of an actor's scene graph to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOrigin {
    /// Equipped armor.
    Armor,
    /// The actor's own body skin.
    Skin,
    /// Face-gen head geometry.
    FaceGen,
}

/// Access to live actor meshes.
pub trait MeshSource: Send + Sync {
    /// Session-independent identity of the actor's record, if known.
    fn content_source(&self, handle: ObjectHandle) -> Option<ContentSource>;

    /// Call `visit` for each skinned shape under `origin` until it returns true.
    ///
    /// Does nothing when the handle no longer resolves.
    fn visit_shapes(
        &self,
        handle: ObjectHandle,
        origin: ShapeOrigin,
        visit: &mut dyn FnMut(&SkinnedShape) -> bool,
    );
}

#[derive(Clone, Copy)]
struct VertexSlot {
    weight: f32,
    new_index: Option<u32>,
}

/// Pull the part of `shape` weighted to `node` out as storage geometry.
///
/// A triangle is kept when any of its vertices is weighted to the bone.
/// Kept vertices are transformed into bone space and renumbered in order of
/// first use; vertices of kept triangles that carry no weight for the bone
/// get weight 0. Returns `None` when the shape has no such triangles or its
/// index data is out of range.
pub fn extract_geometry(shape: &SkinnedShape, node: &str) -> Option<ColliderDataStorage> {
    let bone = shape
        .bones
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(node))?;

    if bone.weights.is_empty() {
        return None;
    }

    let num_vertices = shape.vertices.len();

    let triangles: Vec<[u32; 3]> = shape.partitions.iter().flatten().copied().collect();
    if triangles.is_empty() {
        return None;
    }

    if triangles
        .iter()
        .flatten()
        .any(|&i| i as usize >= num_vertices)
    {
        log::warn!("[bonecast] {}: '{}' triangle index >= vertex count", node, shape.name);
        return None;
    }

    let mut slots = vec![
        VertexSlot {
            weight: 0.0,
            new_index: None,
        };
        num_vertices
    ];
    let mut weighted = vec![false; num_vertices];

    for w in &bone.weights {
        let Some(slot) = slots.get_mut(w.vertex as usize) else {
            log::warn!("[bonecast] {}: '{}' bone weight index >= vertex count", node, shape.name);
            return None;
        };
        slot.weight = w.weight;
        weighted[w.vertex as usize] = true;
    }

    let mut vertices = Vec::new();
    let mut weights = Vec::new();
    let mut indices = Vec::new();

    for tri in triangles
        .iter()
        .filter(|t| t.iter().any(|&i| weighted[i as usize]))
    {
        for &i in tri {
            let slot = &mut slots[i as usize];
            let index = match slot.new_index {
                Some(index) => index,
                None => {
                    let index = vertices.len() as u32;
                    vertices.push(bone.skin_to_bone.apply(shape.vertices[i as usize]));
                    weights.push(slot.weight);
                    slot.new_index = Some(index);
                    index
                }
            };
            indices.push(index);
        }
    }

    if indices.is_empty() {
        return None;
    }

    ColliderDataStorage::new(vertices, weights, indices).ok()
}

/// Search an actor's shapes for geometry weighted to `node`.
///
/// Order: equipped armor, body skin, face-gen. `shape_filter`, when not
/// empty, restricts armor and face-gen shapes by name.
pub fn get_geometry<S: MeshSource + ?Sized>(
    source: &S,
    handle: ObjectHandle,
    node: &str,
    shape_filter: &str,
) -> Option<ColliderDataStorage> {
    let order = [
        (ShapeOrigin::Armor, true),
        (ShapeOrigin::Skin, false),
        (ShapeOrigin::FaceGen, true),
    ];

    let mut found = None;

    for (origin, filtered) in order {
        source.visit_shapes(handle, origin, &mut |shape| {
            if filtered && !shape_filter.is_empty() && !shape.name.eq_ignore_ascii_case(shape_filter) {
                return false;
            }
            found = extract_geometry(shape, node);
            found.is_some()
        });
        if found.is_some() {
            break;
        }
    }

    found
}

/// In-memory [`MeshSource`] keyed by handle, for hosts that snapshot meshes
/// up front and for tests.
#[derive(Debug, Default)]
pub struct StaticMeshSource {
    actors: HashMap<ObjectHandle, StaticActor>,
}

#[derive(Debug, Default)]
struct StaticActor {
    content: Option<ContentSource>,
    shapes: Vec<(ShapeOrigin, SkinnedShape)>,
}

impl StaticMeshSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_content_source(&mut self, handle: ObjectHandle, content: ContentSource) {
        self.actors.entry(handle).or_default().content = Some(content);
    }

    pub fn add_shape(&mut self, handle: ObjectHandle, origin: ShapeOrigin, shape: SkinnedShape) {
        self.actors
            .entry(handle)
            .or_default()
            .shapes
            .push((origin, shape));
    }

    pub fn remove_actor(&mut self, handle: ObjectHandle) {
        self.actors.remove(&handle);
    }
}

impl MeshSource for StaticMeshSource {
    fn content_source(&self, handle: ObjectHandle) -> Option<ContentSource> {
        self.actors.get(&handle)?.content.clone()
    }

    fn visit_shapes(
        &self,
        handle: ObjectHandle,
        origin: ShapeOrigin,
        visit: &mut dyn FnMut(&SkinnedShape) -> bool,
    ) {
        let Some(actor) = self.actors.get(&handle) else {
            return;
        };
        for (o, shape) in &actor.shapes {
            if *o == origin && visit(shape) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_shape(bone: &str, weighted: &[(u32, f32)]) -> SkinnedShape {
        SkinnedShape {
            name: "Body".to_string(),
            vertices: vec![
                MeshPoint::new(0.0, 0.0, 0.0),
                MeshPoint::new(1.0, 0.0, 0.0),
                MeshPoint::new(1.0, 1.0, 0.0),
                MeshPoint::new(0.0, 1.0, 0.0),
                MeshPoint::new(5.0, 5.0, 5.0),
            ],
            partitions: vec![vec![[0, 1, 2]], vec![[0, 2, 3], [2, 3, 4]]],
            bones: vec![BoneBinding {
                name: bone.to_string(),
                skin_to_bone: SkinTransform::IDENTITY,
                weights: weighted
                    .iter()
                    .map(|&(vertex, weight)| VertexWeight { vertex, weight })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_transform() {
        let t = SkinTransform {
            rotation: [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [1.0, 2.0, 3.0],
            scale: 2.0,
        };
        assert_eq!(t.apply(MeshPoint::new(1.0, 0.0, 0.0)), MeshPoint::new(1.0, 4.0, 3.0));
        assert_eq!(
            SkinTransform::IDENTITY.apply(MeshPoint::new(3.0, 4.0, 5.0)),
            MeshPoint::new(3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn test_extract_keeps_bone_triangles() {
        // vertex 1 only touches the first triangle
        let shape = quad_shape("NPC Belly", &[(1, 0.8)]);
        let storage = extract_geometry(&shape, "npc belly").unwrap();

        assert_eq!(storage.num_triangles, 1);
        assert_eq!(storage.indices, vec![0, 1, 2]);
        assert_eq!(storage.weights, vec![0.0, 0.8, 0.0]);
        assert_eq!(storage.vertices[1], MeshPoint::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_extract_renumbers_across_partitions() {
        let shape = quad_shape("B", &[(0, 1.0), (3, 0.5)]);
        let storage = extract_geometry(&shape, "B").unwrap();

        // triangles 0 and 1 touch vertex 0; triangle 2 touches vertex 3
        assert_eq!(storage.num_triangles, 3);
        assert_eq!(storage.num_vertices, 5);
        assert_eq!(storage.indices, vec![0, 1, 2, 0, 2, 3, 2, 3, 4]);
        assert_eq!(storage.weights, vec![1.0, 0.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_extract_rejects_bad_indices() {
        let mut shape = quad_shape("B", &[(0, 1.0)]);
        shape.partitions[0][0] = [0, 1, 9];
        assert!(extract_geometry(&shape, "B").is_none());

        let shape = quad_shape("B", &[(7, 1.0)]);
        assert!(extract_geometry(&shape, "B").is_none());
    }

    #[test]
    fn test_extract_missing_bone_or_weights() {
        let shape = quad_shape("B", &[(0, 1.0)]);
        assert!(extract_geometry(&shape, "Other").is_none());
        assert!(extract_geometry(&quad_shape("B", &[]), "B").is_none());
    }

    #[test]
    fn test_lookup_order_and_shape_filter() {
        let handle = ObjectHandle(1);
        let mut source = StaticMeshSource::new();

        let mut armor = quad_shape("B", &[(4, 1.0)]);
        armor.name = "Cuirass".to_string();
        source.add_shape(handle, ShapeOrigin::Armor, armor);
        source.add_shape(handle, ShapeOrigin::Skin, quad_shape("B", &[(0, 1.0)]));

        let from_armor = get_geometry(&source, handle, "B", "").unwrap();
        assert_eq!(from_armor.num_triangles, 1);

        // the filter skips the armor shape, the skin is never filtered
        let from_skin = get_geometry(&source, handle, "B", "Gloves").unwrap();
        assert_eq!(from_skin.num_triangles, 2);

        assert!(get_geometry(&source, ObjectHandle(2), "B", "").is_none());
    }
}
