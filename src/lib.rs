//! JiggleCast - collider geometry and armor overrides for skinned-mesh physics
//!
//! Bone-cast colliders are cut from the part of an actor's skinned mesh
//! weighted to a skeleton node, reduced to a convex hull, cached in a
//! size-bounded LRU and persisted per content source. Armor overrides are
//! per-armor JSON files adjusting physics values for groups of nodes.

pub mod bonecast;
pub mod config;
pub mod node;

pub use bonecast::{BoneCast, BoneCastTask, BoneResult, ContentSource, MeshSource, ObjectHandle};
pub use config::{EffectiveSettings, Settings, SettingsError};
pub use node::NodeConfig;

pub use jigglecast_armor as armor;
pub use jigglecast_geometry as geometry;
