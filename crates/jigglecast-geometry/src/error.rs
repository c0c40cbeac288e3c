//! Error types for geometry construction, generation and archiving.

use std::io;

use thiserror::Error;

/// Geometry result type
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Errors from geometry operations.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Buffer lengths disagree with their counts, or an index is out of range.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A generation parameter is NaN or infinite.
    #[error("invalid generation parameter {name} = {value}")]
    InvalidParams { name: &'static str, value: f32 },

    /// The source mesh has no vertices or fewer than one triangle.
    #[error("empty source geometry")]
    Empty,

    /// No triangle has all three vertices at or above the weight threshold.
    #[error("no triangles left after weight filtering (threshold {0})")]
    NothingAboveThreshold(f32),

    /// Simplification, de-duplication or hull construction left nothing usable.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("bad archive magic: {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("unsupported archive version {found} (max supported {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl GeometryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}
