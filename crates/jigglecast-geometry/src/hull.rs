//! Convex hull construction backed by parry.

use parry3d::math::Point;
use parry3d::transformation::try_convex_hull;

use crate::error::{GeometryError, GeometryResult};
use crate::point::MeshPoint;

/// Convex hull of `points` as a vertex array and triangle index list.
///
/// Needs at least four points that are not all coplanar.
pub fn convex_hull(points: &[MeshPoint]) -> GeometryResult<(Vec<MeshPoint>, Vec<u32>)> {
    if points.len() < 4 {
        return Err(GeometryError::Degenerate(format!(
            "{} points are not enough for a hull",
            points.len()
        )));
    }

    let input: Vec<Point<f32>> = points.iter().map(|p| Point::new(p.x, p.y, p.z)).collect();

    let (hull_vertices, hull_faces) = try_convex_hull(&input).map_err(|e| {
        GeometryError::Degenerate(format!("convex hull failed ({} points): {e:?}", points.len()))
    })?;

    // collinear input comes back as faces with a repeated corner
    let faces: Vec<[u32; 3]> = hull_faces
        .into_iter()
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .collect();

    let mut remap = vec![None; hull_vertices.len()];
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(faces.len() * 3);
    for &i in faces.iter().flatten() {
        let slot = remap.get_mut(i as usize).ok_or_else(|| {
            GeometryError::Degenerate(format!("hull face index {} out of range", i))
        })?;
        let index = *slot.get_or_insert_with(|| {
            let p = hull_vertices[i as usize];
            vertices.push(MeshPoint::new(p.x, p.y, p.z));
            (vertices.len() - 1) as u32
        });
        indices.push(index);
    }

    if faces.is_empty() || vertices.len() < 3 {
        return Err(GeometryError::Degenerate(format!(
            "convex hull of {} points has no volume",
            points.len()
        )));
    }

    Ok((vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> Vec<MeshPoint> {
        (0..8)
            .map(|i| MeshPoint::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
            .collect()
    }

    #[test]
    fn test_cube_hull() {
        let mut points = cube();
        // interior point must not survive
        points.push(MeshPoint::new(0.5, 0.5, 0.5));

        let (vertices, indices) = convex_hull(&points).unwrap();
        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 12 * 3);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        assert!(!vertices.contains(&MeshPoint::new(0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_collinear_points_have_no_hull() {
        let points: Vec<MeshPoint> = (0..5).map(|i| MeshPoint::new(i as f32, 0.0, 0.0)).collect();
        assert!(matches!(convex_hull(&points), Err(GeometryError::Degenerate(_))));
    }

    #[test]
    fn test_too_few_points() {
        let points = &cube()[..3];
        assert!(matches!(convex_hull(points), Err(GeometryError::Degenerate(_))));
    }
}
