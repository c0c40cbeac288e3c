//! Versioned binary archive for collider storage.
//!
//! Layout: a bincode header `{ magic: b"JCBC", version: u32 }` followed by
//! the storage record for that version. The whole stream may be gzip
//! compressed; readers detect this by the gzip magic.
//!
//! Version history:
//! - 1: vertex count, vertices, weights, indices, vertex count (again), triangle count
//! - 2: same without the repeated vertex count
//!
//! Only the storage half of a `ColliderDataStoragePair` is written.

use std::io::{BufRead, BufReader, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, GeometryResult};
use crate::point::MeshPoint;
use crate::storage::{ColliderDataStorage, ColliderDataStoragePair};

/// Archive magic bytes.
pub const MAGIC: [u8; 4] = *b"JCBC";

/// Version written by this crate.
pub const FORMAT_VERSION: u32 = 2;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
}

#[derive(Serialize)]
struct RecordRefV1<'a> {
    num_vertices: u32,
    vertices: &'a [MeshPoint],
    weights: &'a [f32],
    indices: &'a [u32],
    num_vertices_repeat: u32,
    num_triangles: u32,
}

#[derive(Deserialize)]
struct RecordV1 {
    num_vertices: u32,
    vertices: Vec<MeshPoint>,
    weights: Vec<f32>,
    indices: Vec<u32>,
    num_vertices_repeat: u32,
    num_triangles: u32,
}

#[derive(Serialize)]
struct RecordRefV2<'a> {
    num_vertices: u32,
    vertices: &'a [MeshPoint],
    weights: &'a [f32],
    indices: &'a [u32],
    num_triangles: u32,
}

#[derive(Deserialize)]
struct RecordV2 {
    num_vertices: u32,
    vertices: Vec<MeshPoint>,
    weights: Vec<f32>,
    indices: Vec<u32>,
    num_triangles: u32,
}

/// Summary of an archive, as reported by `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInfo {
    pub version: u32,
    pub compressed: bool,
    pub num_vertices: u32,
    pub num_triangles: u32,
    pub num_indices: usize,
}

/// Write `storage` in the current format.
pub fn write_storage<W: Write>(writer: W, storage: &ColliderDataStorage) -> GeometryResult<()> {
    write_storage_with_version(writer, storage, FORMAT_VERSION)
}

/// Write `storage` in an explicit format version (1 or 2).
pub fn write_storage_with_version<W: Write>(
    mut writer: W,
    storage: &ColliderDataStorage,
    version: u32,
) -> GeometryResult<()> {
    storage.validate()?;

    let header = Header { magic: MAGIC, version };

    match version {
        1 => {
            bincode::serialize_into(&mut writer, &header)?;
            bincode::serialize_into(
                &mut writer,
                &RecordRefV1 {
                    num_vertices: storage.num_vertices,
                    vertices: &storage.vertices,
                    weights: &storage.weights,
                    indices: &storage.indices,
                    num_vertices_repeat: storage.num_vertices,
                    num_triangles: storage.num_triangles,
                },
            )?;
        }
        2 => {
            bincode::serialize_into(&mut writer, &header)?;
            bincode::serialize_into(
                &mut writer,
                &RecordRefV2 {
                    num_vertices: storage.num_vertices,
                    vertices: &storage.vertices,
                    weights: &storage.weights,
                    indices: &storage.indices,
                    num_triangles: storage.num_triangles,
                },
            )?;
        }
        found => {
            return Err(GeometryError::UnsupportedVersion {
                found,
                supported: FORMAT_VERSION,
            })
        }
    }

    writer.flush()?;
    Ok(())
}

/// Read an uncompressed storage record, returning it with its format version.
pub fn read_storage<R: Read>(mut reader: R) -> GeometryResult<(ColliderDataStorage, u32)> {
    let header: Header = bincode::deserialize_from(&mut reader)?;
    if header.magic != MAGIC {
        return Err(GeometryError::BadMagic(header.magic));
    }

    let storage = match header.version {
        1 => {
            let r: RecordV1 = bincode::deserialize_from(&mut reader)?;
            if r.num_vertices_repeat != r.num_vertices {
                return Err(GeometryError::invalid(format!(
                    "vertex count mismatch in v1 record ({} vs {})",
                    r.num_vertices, r.num_vertices_repeat
                )));
            }
            ColliderDataStorage {
                vertices: r.vertices.into(),
                weights: r.weights,
                indices: r.indices,
                num_triangles: r.num_triangles,
                num_vertices: r.num_vertices,
            }
        }
        2 => {
            let r: RecordV2 = bincode::deserialize_from(&mut reader)?;
            ColliderDataStorage {
                vertices: r.vertices.into(),
                weights: r.weights,
                indices: r.indices,
                num_triangles: r.num_triangles,
                num_vertices: r.num_vertices,
            }
        }
        found => {
            return Err(GeometryError::UnsupportedVersion {
                found,
                supported: FORMAT_VERSION,
            })
        }
    };

    storage.validate()?;

    Ok((storage, header.version))
}

/// Write the persisted half of `pair`, gzip-compressed when `compress` is set.
pub fn write_pair<W: Write>(
    writer: W,
    pair: &ColliderDataStoragePair,
    compress: bool,
) -> GeometryResult<()> {
    if compress {
        let mut encoder = GzEncoder::new(writer, Compression::fast());
        write_storage(&mut encoder, &pair.storage)?;
        encoder.finish()?;
        Ok(())
    } else {
        write_storage(writer, &pair.storage)
    }
}

/// Read a pair written by `write_pair`; the runtime half is left empty.
pub fn read_pair<R: Read>(reader: R) -> GeometryResult<ColliderDataStoragePair> {
    let (storage, _) = read_any(reader)?;
    let mut pair = ColliderDataStoragePair::from_storage(storage);
    pair.mark_persisted();
    Ok(pair)
}

/// Decode an archive and describe it.
pub fn inspect<R: Read>(reader: R) -> GeometryResult<ArchiveInfo> {
    let mut reader = BufReader::new(reader);
    let compressed = is_gzip(&mut reader)?;
    let (storage, version) = read_any(reader)?;

    Ok(ArchiveInfo {
        version,
        compressed,
        num_vertices: storage.num_vertices,
        num_triangles: storage.num_triangles,
        num_indices: storage.indices.len(),
    })
}

fn read_any<R: Read>(reader: R) -> GeometryResult<(ColliderDataStorage, u32)> {
    let mut reader = BufReader::new(reader);
    if is_gzip(&mut reader)? {
        read_storage(GzDecoder::new(reader))
    } else {
        read_storage(reader)
    }
}

fn is_gzip<R: BufRead>(reader: &mut R) -> GeometryResult<bool> {
    let buf = reader.fill_buf()?;
    Ok(buf.len() >= 2 && buf[..2] == GZIP_MAGIC)
}
