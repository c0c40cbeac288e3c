//! Runtime geometry generation: weight filter, simplify, hull.

use std::sync::Arc;

use crate::collider::ColliderData;
use crate::error::{GeometryError, GeometryResult};
use crate::hull::convex_hull;
use crate::mesh::{
    filter_indices_by_weight, remove_duplicate_vertices, remove_unreferenced_vertices, simplify,
};
use crate::point::MeshPoint;
use crate::storage::{ColliderDataStoragePair, GenerationParams};

/// Distance under which two vertices are treated as one.
pub const DUPLICATE_EPSILON: f32 = 1e-5;

/// Regenerate the runtime half of `pair` from its storage half.
///
/// On error `pair` is left exactly as it was.
pub fn update_geometry(pair: &mut ColliderDataStoragePair, params: &GenerationParams) -> GeometryResult<()> {
    let data = build_collider(pair, params)?;
    pair.set_runtime(data, params);
    Ok(())
}

/// Build the convex-hull collider for `pair.storage` without modifying it.
pub fn build_collider(
    pair: &ColliderDataStoragePair,
    params: &GenerationParams,
) -> GeometryResult<ColliderData> {
    params.validate()?;
    let storage = &pair.storage;

    if storage.num_vertices == 0 || storage.indices.len() < 3 {
        return Err(GeometryError::Empty);
    }
    storage.validate()?;

    let starting = storage.indices.len();

    let filtered =
        filter_indices_by_weight(&storage.indices, &storage.weights, params.weight_threshold);
    if filtered.len() < 3 {
        return Err(GeometryError::NothingAboveThreshold(params.weight_threshold));
    }

    let num_indices = filtered.len();
    let target = (num_indices as f64 * params.simplify_target as f64) as usize;

    let indices = if target < num_indices {
        let target = (target - target % 3).clamp(3, num_indices);
        let simplified = simplify(
            &filtered,
            &storage.vertices,
            target,
            params.simplify_target_error,
        );
        if simplified.len() % 3 != 0 || simplified.len() < 3 {
            return Err(GeometryError::Degenerate(format!(
                "simplification produced {} indices",
                simplified.len()
            )));
        }
        simplified
    } else {
        filtered.into_owned()
    };

    let (vertices, indices) = if indices.len() != starting {
        remove_unreferenced_vertices(&storage.vertices, &indices)
    } else {
        (storage.vertices.to_vec(), indices)
    };

    let (vertices, indices) = remove_duplicate_vertices(&vertices, &indices, DUPLICATE_EPSILON);
    if vertices.is_empty() || indices.len() < 3 {
        return Err(GeometryError::Degenerate(
            "no faces left after merging duplicate vertices".to_string(),
        ));
    }

    let points = referenced_points(&vertices, &indices);
    let (hull_vertices, hull_indices) = convex_hull(&points)?;

    log::debug!(
        "[bonecast] hull: {} source indices -> {} filtered -> {} points -> {} hull vertices",
        starting,
        num_indices,
        points.len(),
        hull_vertices.len()
    );

    let shared = hull_vertices.len() == storage.vertices.len()
        && hull_vertices
            .iter()
            .zip(storage.vertices.iter())
            .all(|(a, b)| a.bit_eq(b));

    let hull_vertices: Arc<[MeshPoint]> = if shared {
        Arc::clone(&storage.vertices)
    } else {
        Arc::from(hull_vertices)
    };

    ColliderData::from_parts(hull_vertices, hull_indices)
}

fn referenced_points(vertices: &[MeshPoint], indices: &[u32]) -> Vec<MeshPoint> {
    let mut used = vec![false; vertices.len()];
    for &i in indices {
        used[i as usize] = true;
    }
    vertices
        .iter()
        .zip(used)
        .filter_map(|(v, u)| u.then_some(*v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ColliderDataStorage;

    /// Unit cube, vertex `i` at (i&1, i>>1&1, i>>2&1); vertex 7 weighted low.
    fn cube_pair() -> ColliderDataStoragePair {
        let vertices = (0..8)
            .map(|i| MeshPoint::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
            .collect();
        let weights = vec![0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.4];
        let indices = vec![
            0, 2, 1, 1, 2, 3, // z = 0
            4, 5, 6, 5, 7, 6, // z = 1
            0, 1, 4, 1, 5, 4, // y = 0
            2, 6, 3, 3, 6, 7, // y = 1
            0, 4, 2, 2, 4, 6, // x = 0
            1, 3, 5, 3, 7, 5, // x = 1
        ];
        ColliderDataStoragePair::from_storage(
            ColliderDataStorage::new(vertices, weights, indices).unwrap(),
        )
    }

    #[test]
    fn test_full_cube_hull() {
        let mut pair = cube_pair();
        let params = GenerationParams {
            weight_threshold: 0.3,
            simplify_target: 1.0,
            simplify_target_error: 0.01,
        };

        update_geometry(&mut pair, &params).unwrap();

        let data = pair.runtime();
        assert_eq!(data.num_vertices(), 8);
        assert_eq!(data.num_indices(), 3 * data.num_triangles());
        assert!(pair.matches(&params));
        assert!(pair.size() > pair.storage.size_bytes());
    }

    #[test]
    fn test_threshold_drops_low_weight_corner() {
        let mut pair = cube_pair();
        let params = GenerationParams {
            weight_threshold: 0.5,
            simplify_target: 1.0,
            simplify_target_error: 0.01,
        };

        update_geometry(&mut pair, &params).unwrap();

        let data = pair.runtime();
        assert_eq!(data.num_vertices(), 7);
        assert!(!data.vertices().contains(&MeshPoint::new(1.0, 1.0, 1.0)));
        assert!(!pair.vertices_shared());
    }

    #[test]
    fn test_failure_leaves_pair_untouched() {
        let mut pair = cube_pair();
        let good = GenerationParams::default();
        update_geometry(&mut pair, &good).unwrap();
        let before = Arc::clone(pair.runtime());

        let too_high = GenerationParams {
            weight_threshold: 0.95,
            ..good
        };
        let err = update_geometry(&mut pair, &too_high).unwrap_err();

        assert!(matches!(err, GeometryError::NothingAboveThreshold(_)));
        assert!(Arc::ptr_eq(&before, pair.runtime()));
        assert!(pair.matches(&good));
    }

    #[test]
    fn test_empty_storage() {
        let mut pair = ColliderDataStoragePair::default();
        assert!(matches!(
            update_geometry(&mut pair, &GenerationParams::default()),
            Err(GeometryError::Empty)
        ));
    }

    #[test]
    fn test_flat_mesh_is_degenerate() {
        let storage = ColliderDataStorage::new(
            vec![
                MeshPoint::new(0.0, 0.0, 0.0),
                MeshPoint::new(1.0, 0.0, 0.0),
                MeshPoint::new(0.0, 1.0, 0.0),
            ],
            vec![1.0; 3],
            vec![0, 1, 2],
        )
        .unwrap();
        let mut pair = ColliderDataStoragePair::from_storage(storage);
        assert!(matches!(
            update_geometry(&mut pair, &GenerationParams::default()),
            Err(GeometryError::Degenerate(_))
        ));
    }

    #[test]
    fn test_collinear_mesh_keeps_previous_collider() {
        let mut pair = cube_pair();
        update_geometry(&mut pair, &GenerationParams::default()).unwrap();
        let before = Arc::clone(pair.runtime());

        let line = ColliderDataStorage::new(
            (0..4).map(|i| MeshPoint::new(i as f32, 0.0, 0.0)).collect(),
            vec![1.0; 4],
            vec![0, 1, 2, 1, 2, 3],
        )
        .unwrap();
        let mut line_pair = ColliderDataStoragePair::from_storage(line);
        assert!(matches!(
            update_geometry(&mut line_pair, &GenerationParams::default()),
            Err(GeometryError::Degenerate(_))
        ));
        assert!(line_pair.runtime().is_empty());

        pair.storage = line_pair.storage.clone();
        assert!(update_geometry(&mut pair, &GenerationParams::default()).is_err());
        assert!(Arc::ptr_eq(&before, pair.runtime()));
    }

    #[test]
    fn test_non_finite_params_are_rejected() {
        let mut pair = cube_pair();
        update_geometry(&mut pair, &GenerationParams::default()).unwrap();
        let before = Arc::clone(pair.runtime());

        let nan_error = GenerationParams {
            simplify_target: 0.5,
            simplify_target_error: f32::NAN,
            ..GenerationParams::default()
        };
        assert!(matches!(
            update_geometry(&mut pair, &nan_error),
            Err(GeometryError::InvalidParams { name: "simplify_target_error", .. })
        ));

        let inf_threshold = GenerationParams {
            weight_threshold: f32::INFINITY,
            ..GenerationParams::default()
        };
        assert!(update_geometry(&mut pair, &inf_threshold).is_err());
        assert!(Arc::ptr_eq(&before, pair.runtime()));
    }
}
