//! Bone-cast colliders: geometry cut from the part of a skinned mesh
//! weighted to one skeleton node, hulled, cached and persisted.
//!
//! - `cache`: size-bounded LRU of generated geometry
//! - `io`: one file per (content source, node)
//! - `source`: live mesh access and extraction
//! - `service`: `BoneCast`, the locked façade over all of the above
//! - `task`: deferred `get`/`update` for an external work queue

pub mod cache;
pub mod error;
pub mod handle;
pub mod io;
pub mod service;
pub mod source;
pub mod task;

pub use cache::{BoneCacheUpdateId, BoneCastCache, CacheEntry, CacheKey};
pub use error::{BoneCastError, BoneCastIoError, BoneCastIoResult, BoneCastResult};
pub use handle::{key_path, ContentSource, ObjectHandle};
pub use io::BoneCastIo;
pub use service::{BoneCast, BoneCastShared, BoneResult};
pub use source::{
    extract_geometry, get_geometry, BoneBinding, MeshSource, ShapeOrigin, SkinTransform,
    SkinnedShape, StaticMeshSource, VertexWeight,
};
pub use task::{BoneCastTask, InlineQueue, Job, TaskKind, WorkQueue};
