//! Mesh point type shared by storage and runtime geometry.

use serde::{Deserialize, Serialize};

/// A 3-D point laid out like a SIMD vector (x, y, z, padding).
///
/// Only `x`, `y` and `z` are serialized; the padding lane is always zero
/// after construction or load.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
#[repr(C, align(16))]
pub struct MeshPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    w: f32,
}

impl MeshPoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 0.0 }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn distance_squared(&self, other: &MeshPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Component-wise minimum.
    pub fn min(self, other: MeshPoint) -> MeshPoint {
        MeshPoint::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    pub fn max(self, other: MeshPoint) -> MeshPoint {
        MeshPoint::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Bitwise equality of the three serialized lanes.
    pub fn bit_eq(&self, other: &MeshPoint) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.z.to_bits() == other.z.to_bits()
    }
}

impl From<[f32; 3]> for MeshPoint {
    fn from(v: [f32; 3]) -> Self {
        MeshPoint::new(v[0], v[1], v[2])
    }
}

impl From<MeshPoint> for [f32; 3] {
    fn from(p: MeshPoint) -> Self {
        p.to_array()
    }
}

/// Axis-aligned bounds of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: MeshPoint,
    pub max: MeshPoint,
}

impl Aabb {
    /// Bounds of `points`, or `None` for an empty set.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MeshPoint>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Aabb { min: first, max: first };
        for p in iter {
            bounds.min = bounds.min.min(*p);
            bounds.max = bounds.max.max(*p);
        }
        Some(bounds)
    }

    /// Length of the longest side.
    pub fn extent(&self) -> f32 {
        (self.max.x - self.min.x)
            .max(self.max.y - self.min.y)
            .max(self.max.z - self.min.z)
    }
}
