//! Index-buffer processing used by the generation pipeline.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::point::{Aabb, MeshPoint};

/// Keep only triangles whose three vertices all reach `threshold`.
///
/// A threshold of zero or less keeps the index list as is.
pub fn filter_indices_by_weight<'a>(
    indices: &'a [u32],
    weights: &[f32],
    threshold: f32,
) -> Cow<'a, [u32]> {
    if threshold <= 0.0 {
        return Cow::Borrowed(indices);
    }

    let mut out = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let keep = tri
            .iter()
            .all(|&i| weights.get(i as usize).is_some_and(|&w| w >= threshold));
        if keep {
            out.extend_from_slice(tri);
        }
    }

    Cow::Owned(out)
}

/// Simplify a triangle list toward `target_index_count` by collapsing short edges.
///
/// Only edges no longer than `target_error` times the mesh extent are
/// collapsed, so the result may stay above the target. A collapse keeps the
/// surviving endpoint's position; degenerate and duplicate triangles are
/// dropped after each pass. The result never drops below one triangle.
pub fn simplify(
    indices: &[u32],
    vertices: &[MeshPoint],
    target_index_count: usize,
    target_error: f32,
) -> Vec<u32> {
    let mut current = indices.to_vec();
    if current.len() <= target_index_count || !target_error.is_finite() || target_error <= 0.0 {
        return current;
    }

    let extent = Aabb::from_points(current.iter().filter_map(|&i| vertices.get(i as usize)))
        .map(|b| b.extent())
        .unwrap_or(0.0);
    let max_len = target_error * extent;
    let max_len_sq = max_len * max_len;

    loop {
        let mut edges = collect_edges(&current, vertices);
        edges.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Each interior collapse removes about two triangles.
        let over = (current.len() - target_index_count) / 3;
        let budget = (over / 2).max(1);

        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut locked: HashSet<u32> = HashSet::new();

        for (len_sq, a, b) in edges {
            if len_sq > max_len_sq || remap.len() >= budget {
                break;
            }
            if locked.contains(&a) || locked.contains(&b) {
                continue;
            }
            remap.insert(b, a);
            locked.insert(a);
            locked.insert(b);
        }

        if remap.is_empty() {
            break;
        }

        let next = rebuild(&current, |i| remap.get(&i).copied().unwrap_or(i));
        if next.len() < 3 {
            break;
        }

        current = next;
        if current.len() <= target_index_count {
            break;
        }
    }

    current
}

/// Drop vertices no triangle references, renumbering in first-use order.
pub fn remove_unreferenced_vertices(
    vertices: &[MeshPoint],
    indices: &[u32],
) -> (Vec<MeshPoint>, Vec<u32>) {
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut out_vertices = Vec::new();
    let mut out_indices = Vec::with_capacity(indices.len());

    for &i in indices {
        let next = *remap.entry(i).or_insert_with(|| {
            out_vertices.push(vertices[i as usize]);
            (out_vertices.len() - 1) as u32
        });
        out_indices.push(next);
    }

    (out_vertices, out_indices)
}

/// Merge vertices closer than `epsilon` (grid-quantized) and drop faces that collapse.
pub fn remove_duplicate_vertices(
    vertices: &[MeshPoint],
    indices: &[u32],
    epsilon: f32,
) -> (Vec<MeshPoint>, Vec<u32>) {
    let inv = 1.0 / epsilon.max(1e-9);
    let mut seen: HashMap<(i64, i64, i64), u32> = HashMap::new();
    let mut out_vertices = Vec::with_capacity(vertices.len());
    let mut remap = Vec::with_capacity(vertices.len());

    for v in vertices {
        let key = (
            (v.x * inv).round() as i64,
            (v.y * inv).round() as i64,
            (v.z * inv).round() as i64,
        );
        let idx = *seen.entry(key).or_insert_with(|| {
            out_vertices.push(*v);
            (out_vertices.len() - 1) as u32
        });
        remap.push(idx);
    }

    let out_indices = rebuild(indices, |i| remap[i as usize]);

    (out_vertices, out_indices)
}

fn collect_edges(indices: &[u32], vertices: &[MeshPoint]) -> Vec<(f32, u32, u32)> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (a.min(b), a.max(b));
            if a == b || !seen.insert(key) {
                continue;
            }
            let len_sq = vertices[key.0 as usize].distance_squared(&vertices[key.1 as usize]);
            edges.push((len_sq, key.0, key.1));
        }
    }

    edges
}

/// Apply `map` to every index, then drop degenerate and duplicate triangles.
fn rebuild<F>(indices: &[u32], map: F) -> Vec<u32>
where
    F: Fn(u32) -> u32,
{
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(indices.len());

    for tri in indices.chunks_exact(3) {
        let t = [map(tri[0]), map(tri[1]), map(tri[2])];
        if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
            continue;
        }
        let mut key = t;
        key.sort_unstable();
        if seen.insert(key) {
            out.extend_from_slice(&t);
        }
    }

    out
}
