//! Path-keyed cache of armor override files.
//!
//! File format: a JSON object of groups, each an object of overrides, each
//! override a `[tag, value]` array:
//!
//! ```json
//! { "breast": { "s": [0, 12.5], "d": [1, 0.8] } }
//! ```
//!
//! Malformed structure fails the whole load. Override names missing from the
//! registry are skipped with a warning.
//!
//! `ArmorCache` is not synchronized; share it behind a `Mutex` if needed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::entry::{copy_to_sorted, ArmorCacheEntry, ArmorCacheEntrySorted, ArmorValue, OverrideMode};
use crate::error::{ArmorCacheError, ArmorResult, ParseError};
use crate::key::CiString;
use crate::registry::ValueRegistry;

/// Loaded override files, kept for the life of the cache.
#[derive(Debug)]
pub struct ArmorCache {
    root: Option<PathBuf>,
    registry: ValueRegistry,
    entries: HashMap<PathBuf, ArmorCacheEntry>,
    last_error: Option<ArmorCacheError>,
}

impl Default for ArmorCache {
    fn default() -> Self {
        Self::new(ValueRegistry::physics_defaults())
    }
}

impl ArmorCache {
    /// Cache resolving paths as given.
    pub fn new(registry: ValueRegistry) -> Self {
        Self {
            root: None,
            registry,
            entries: HashMap::new(),
            last_error: None,
        }
    }

    /// Cache resolving relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>, registry: ValueRegistry) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::new(registry)
        }
    }

    pub fn registry(&self) -> &ValueRegistry {
        &self.registry
    }

    /// Full path for `path`: joined to the root when relative.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Cached entry for `path`, loading it on first access.
    ///
    /// Returns `None` and records the error when the load fails.
    pub fn get_entry(&mut self, path: impl AsRef<Path>) -> Option<&ArmorCacheEntry> {
        let key = self.resolve(path);
        if self.entries.contains_key(&key) {
            return self.entries.get(&key);
        }
        self.load_resolved(key)
    }

    /// Read and parse `path`, replacing any cached entry on success.
    ///
    /// On failure the previous entry stays and the error is recorded.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Option<&ArmorCacheEntry> {
        let key = self.resolve(path);
        self.load_resolved(key)
    }

    fn load_resolved(&mut self, key: PathBuf) -> Option<&ArmorCacheEntry> {
        match self.read_entry(&key) {
            Ok(entry) => Some(self.store(key, entry)),
            Err(e) => {
                log::warn!("[armor] load failed: {}", e);
                self.last_error = Some(e);
                None
            }
        }
    }

    /// `load` returning the error instead of recording it.
    pub fn try_load(&mut self, path: impl AsRef<Path>) -> ArmorResult<&ArmorCacheEntry> {
        let key = self.resolve(path);
        let entry = self.read_entry(&key)?;
        Ok(self.store(key, entry))
    }

    /// Write `entry` to `path` and cache it. Records the error and returns
    /// false on failure, leaving the cache untouched.
    pub fn save(&mut self, path: impl AsRef<Path>, entry: ArmorCacheEntry) -> bool {
        match self.try_save(path, entry) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[armor] save failed: {}", e);
                self.last_error = Some(e);
                false
            }
        }
    }

    /// `save` returning the error instead of recording it.
    pub fn try_save(&mut self, path: impl AsRef<Path>, entry: ArmorCacheEntry) -> ArmorResult<()> {
        let key = self.resolve(path);
        write_entry(&key, &entry)?;
        log::debug!("[armor] saved {}", key.display());
        self.store(key, entry);
        Ok(())
    }

    pub fn has_entry(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(&self.resolve(path))
    }

    /// Sorted copy of the cached entry for `path`, if loaded.
    pub fn sorted(&self, path: impl AsRef<Path>) -> Option<ArmorCacheEntrySorted> {
        let entry = self.entries.get(&self.resolve(path))?;
        let mut sorted = ArmorCacheEntrySorted::new();
        copy_to_sorted(entry, &mut sorted);
        Some(sorted)
    }

    pub fn last_error(&self) -> Option<&ArmorCacheError> {
        self.last_error.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn read_entry(&self, path: &Path) -> ArmorResult<ArmorCacheEntry> {
        let bytes = fs::read(path).map_err(|source| ArmorCacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root: Value = serde_json::from_slice(&bytes).map_err(|source| ArmorCacheError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        parse_entry(&root, &self.registry).map_err(|source| ArmorCacheError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn store(&mut self, key: PathBuf, entry: ArmorCacheEntry) -> &ArmorCacheEntry {
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(entry);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(entry),
        }
    }
}

/// Parse an override document, keeping only names known to `registry`.
pub fn parse_entry(root: &Value, registry: &ValueRegistry) -> Result<ArmorCacheEntry, ParseError> {
    let groups = match root {
        Value::Null => return Err(ParseError::NullRoot),
        Value::Object(groups) => groups,
        _ => return Err(ParseError::RootNotObject),
    };

    let mut entry = ArmorCacheEntry::new();

    for (group, values) in groups {
        let values = values
            .as_object()
            .ok_or_else(|| ParseError::GroupNotObject(group.clone()))?;

        let out = entry.entry(CiString::from(group.as_str())).or_default();

        for (name, v) in values {
            let value = parse_value(group, name, v)?;

            let key = CiString::from(name.as_str());
            if !registry.contains(&key) {
                log::warn!("[armor] unknown value name: {}", name);
                continue;
            }

            // one override per value; aliases keep the first spelling seen
            let existing = out.keys().find(|k| registry.same_value(k, &key)).cloned();
            let key = match existing {
                Some(existing) => {
                    log::warn!("[armor] {}: '{}' repeats an earlier alias, last one wins", group, name);
                    existing
                }
                None => key,
            };
            out.insert(key, value);
        }
    }

    Ok(entry)
}

fn parse_value(group: &str, name: &str, v: &Value) -> Result<ArmorValue, ParseError> {
    let at = || (group.to_string(), name.to_string());

    let items = v.as_array().ok_or_else(|| {
        let (group, name) = at();
        ParseError::ExpectedArray { group, name }
    })?;

    if items.len() != 2 {
        let (group, name) = at();
        return Err(ParseError::ArraySize {
            group,
            name,
            len: items.len(),
        });
    }

    let tag = match &items[0] {
        Value::Number(n) => n,
        _ => {
            let (group, name) = at();
            return Err(ParseError::TypeNotNumeric { group, name });
        }
    };

    let value = items[1].as_f64().ok_or_else(|| {
        let (group, name) = at();
        ParseError::ValueNotNumeric { group, name }
    })?;

    let mode = tag_as_u64(tag).and_then(OverrideMode::from_tag).ok_or_else(|| {
        let (group, name) = at();
        ParseError::TypeOutOfRange {
            group,
            name,
            tag: tag.clone(),
        }
    })?;

    Ok(ArmorValue::new(mode, value as f32))
}

fn tag_as_u64(n: &serde_json::Number) -> Option<u64> {
    n.as_u64()
        .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// JSON form of `entry`, groups and names in case-insensitive order.
pub fn serialize_entry(entry: &ArmorCacheEntry) -> serde_json::Result<Value> {
    let mut sorted = ArmorCacheEntrySorted::new();
    copy_to_sorted(entry, &mut sorted);
    serde_json::to_value(&sorted)
}

fn write_entry(path: &Path, entry: &ArmorCacheEntry) -> ArmorResult<()> {
    let io_err = |source: std::io::Error| ArmorCacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json_err = |source: serde_json::Error| ArmorCacheError::Json {
        path: path.to_path_buf(),
        source,
    };

    let value = serialize_entry(entry).map_err(json_err)?;
    let mut bytes = serde_json::to_vec_pretty(&value).map_err(json_err)?;
    bytes.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = fs::File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(&bytes)?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(e));
    }

    Ok(())
}
