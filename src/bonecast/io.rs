//! Per-key geometry files on disk.
//!
//! One file per (content source, node), named by the hashed key. Only the
//! storage half of a pair is written; the runtime half is rebuilt by the
//! caller after a read.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use jigglecast_geometry::{archive, ColliderDataStoragePair};

use super::error::{BoneCastIoError, BoneCastIoResult};
use super::handle::{key_path, ContentSource};

#[derive(Debug)]
pub struct BoneCastIo {
    root: PathBuf,
    compress: bool,
    last_error: Option<BoneCastIoError>,
}

impl BoneCastIo {
    pub fn new(root: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            root: root.into(),
            compress,
            last_error: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, source: &ContentSource, node: &str) -> PathBuf {
        key_path(&self.root, &source.cache_key(node))
    }

    pub fn try_read(&self, source: &ContentSource, node: &str) -> BoneCastIoResult<ColliderDataStoragePair> {
        let path = self.entry_path(source, node);

        let file = File::open(&path).map_err(|e| BoneCastIoError::Io {
            path: path.clone(),
            source: e,
        })?;

        archive::read_pair(BufReader::new(file))
            .map_err(|e| BoneCastIoError::Archive { path, source: e })
    }

    /// Write to `<path>.tmp` and rename into place.
    pub fn try_write(
        &self,
        source: &ContentSource,
        node: &str,
        pair: &ColliderDataStoragePair,
    ) -> BoneCastIoResult<()> {
        let path = self.entry_path(source, node);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BoneCastIoError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Err(e) = self.write_file(&tmp, pair) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(BoneCastIoError::Io { path, source: e });
        }

        log::debug!("[bonecast-io] wrote {}", path.display());
        Ok(())
    }

    fn write_file(&self, tmp: &Path, pair: &ColliderDataStoragePair) -> BoneCastIoResult<()> {
        let io_err = |e: std::io::Error| BoneCastIoError::Io {
            path: tmp.to_path_buf(),
            source: e,
        };

        let file = File::create(tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        archive::write_pair(&mut writer, pair, self.compress).map_err(|e| {
            BoneCastIoError::Archive {
                path: tmp.to_path_buf(),
                source: e,
            }
        })?;

        writer.flush().map_err(io_err)?;
        writer.get_ref().sync_all().map_err(io_err)?;
        Ok(())
    }

    /// Read, recording any failure. A missing file is not logged.
    pub fn read(&mut self, source: &ContentSource, node: &str) -> Option<ColliderDataStoragePair> {
        match self.try_read(source, node) {
            Ok(pair) => Some(pair),
            Err(e) => {
                if !matches!(&e, BoneCastIoError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound) {
                    log::warn!("[bonecast-io] read failed: {}", e);
                }
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Write, recording any failure.
    pub fn write(&mut self, source: &ContentSource, node: &str, pair: &ColliderDataStoragePair) -> bool {
        match self.try_write(source, node, pair) {
            Ok(()) => true,
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }

    pub fn last_error(&self) -> Option<&BoneCastIoError> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jigglecast_geometry::{ColliderDataStorage, MeshPoint};
    use tempfile::TempDir;

    fn pair() -> ColliderDataStoragePair {
        ColliderDataStoragePair::from_storage(
            ColliderDataStorage::new(
                vec![
                    MeshPoint::new(0.0, 0.0, 0.0),
                    MeshPoint::new(1.0, 0.0, 0.0),
                    MeshPoint::new(0.0, 1.0, 0.0),
                ],
                vec![1.0, 0.5, 0.25],
                vec![0, 1, 2],
            )
            .unwrap(),
        )
    }

    fn source() -> ContentSource {
        ContentSource::Plugin {
            name: "Outfit.esp".to_string(),
            local_form_id: 0x801,
        }
    }

    #[test]
    fn test_write_then_read() {
        for compress in [true, false] {
            let dir = TempDir::new().unwrap();
            let mut io = BoneCastIo::new(dir.path(), compress);

            assert!(io.write(&source(), "NPC Belly", &pair()));
            let path = io.entry_path(&source(), "NPC Belly");
            assert!(path.exists());
            assert!(!path.with_extension("bin.tmp").exists());

            let loaded = io.read(&source(), "NPC Belly").unwrap();
            assert_eq!(loaded.storage.indices, vec![0, 1, 2]);
            assert_eq!(loaded.storage.weights, vec![1.0, 0.5, 0.25]);
            assert!(io.last_error().is_none());
        }
    }

    #[test]
    fn test_path_ignores_handle_and_case_of_plugin() {
        let io = BoneCastIo::new("/cache", true);
        let other = ContentSource::Plugin {
            name: "OUTFIT.ESP".to_string(),
            local_form_id: 0x801,
        };
        assert_eq!(io.entry_path(&source(), "N"), io.entry_path(&other, "N"));
        assert!(io.entry_path(&source(), "N").starts_with("/cache"));
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let mut io = BoneCastIo::new(dir.path(), true);

        assert!(io.read(&source(), "N").is_none());
        assert!(matches!(io.last_error(), Some(BoneCastIoError::Io { .. })));

        let path = io.entry_path(&source(), "N");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not an archive").unwrap();
        assert!(io.read(&source(), "N").is_none());
        assert!(matches!(io.last_error(), Some(BoneCastIoError::Archive { .. })));
    }

    #[test]
    fn test_write_failure_is_recorded() {
        let dir = TempDir::new().unwrap();
        // a regular file where the data root should be
        let root = dir.path().join("root");
        fs::write(&root, b"").unwrap();

        let mut io = BoneCastIo::new(&root, false);
        assert!(!io.write(&source(), "N", &pair()));
        assert!(io.last_error().is_some());
    }
}
