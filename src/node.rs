//! Per-node physics configuration consumed by the bone-cast pipeline.

use jigglecast_geometry::GenerationParams;
use serde::{Deserialize, Serialize};

/// Bone-cast settings for one skeleton node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Build a collider from the mesh weighted to this node.
    pub bone_cast: bool,

    /// Minimum skin weight a triangle's vertices need to be kept.
    pub weight_threshold: f32,

    /// Fraction of filtered indices to keep when simplifying (1.0 = off).
    pub simplify_target: f32,

    /// Longest collapsible edge, as a fraction of the mesh extent.
    pub simplify_target_error: f32,

    /// Only consider armor/face shapes with this name; empty matches any.
    pub shape: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            bone_cast: false,
            weight_threshold: params.weight_threshold,
            simplify_target: params.simplify_target,
            simplify_target_error: params.simplify_target_error,
            shape: String::new(),
        }
    }
}

impl NodeConfig {
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            weight_threshold: self.weight_threshold,
            simplify_target: self.simplify_target,
            simplify_target_error: self.simplify_target_error,
        }
    }
}
