//! Bone-cast error types.

use std::path::PathBuf;

use jigglecast_geometry::GeometryError;
use thiserror::Error;

use super::handle::ObjectHandle;

/// Bone-cast disk I/O result type
pub type BoneCastIoResult<T> = Result<T, BoneCastIoError>;

/// Errors reading or writing a cached geometry file.
#[derive(Debug, Error)]
pub enum BoneCastIoError {
    #[error("{path}: I/O error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: GeometryError,
    },
}

/// Bone-cast result type
pub type BoneCastResult<T> = Result<T, BoneCastError>;

/// Errors from the bone-cast pipeline.
#[derive(Debug, Error)]
pub enum BoneCastError {
    #[error("bone cast is disabled for node '{0}'")]
    Disabled(String),

    #[error("[{handle}] no geometry weighted to '{node}'")]
    NoGeometry { handle: ObjectHandle, node: String },

    #[error("[{handle}] collider for '{node}' is empty")]
    EmptyCollider { handle: ObjectHandle, node: String },

    #[error("entry of {size} bytes does not fit the {max} byte cache")]
    TooLarge { size: usize, max: usize },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Io(#[from] BoneCastIoError),
}
