//! Collider geometry for bone-cast physics colliders.
//!
//! - `point`, `collider`: runtime geometry handed to the physics engine
//! - `storage`: persisted source geometry and the storage/runtime pair
//! - `archive`: versioned binary encoding of the storage half
//! - `mesh`, `hull`, `generate`: the regeneration pipeline

pub mod archive;
pub mod collider;
pub mod error;
pub mod generate;
pub mod hull;
pub mod mesh;
pub mod point;
pub mod storage;

pub use archive::{inspect, read_pair, write_pair, ArchiveInfo, FORMAT_VERSION, MAGIC};
pub use collider::{ColliderData, TriVertexArray};
pub use error::{GeometryError, GeometryResult};
pub use generate::{build_collider, update_geometry};
pub use point::{Aabb, MeshPoint};
pub use storage::{ColliderDataStorage, ColliderDataStoragePair, GenerationMeta, GenerationParams};
