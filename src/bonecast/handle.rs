//! Live object handles and the session-independent identity behind them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque handle to a live actor. Only stable within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(pub u64);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Where an actor's record comes from, stable across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSource {
    /// A record owned by a loaded plugin.
    Plugin { name: String, local_form_id: u32 },
    /// A record with no known plugin; keyed by its full form id.
    Raw { form_id: u32 },
}

impl ContentSource {
    /// Plain-text key for `node`, before hashing.
    pub fn key_string(&self, node: &str) -> String {
        match self {
            Self::Plugin {
                name,
                local_form_id,
            } => format!("{}.{}.{}", local_form_id, name.to_lowercase(), node),
            Self::Raw { form_id } => format!("{}.{}", form_id, node),
        }
    }

    /// Lowercase hex SHA-256 of [`key_string`](Self::key_string).
    pub fn cache_key(&self, node: &str) -> String {
        hex::encode(Sha256::digest(self.key_string(node).as_bytes()))
    }

    /// Path of the cache file for `node` relative to the data root.
    pub fn relative_path(&self, node: &str) -> PathBuf {
        key_path(Path::new(""), &self.cache_key(node))
    }
}

/// `<root>/<first two hex chars>/<key>.bin`
pub fn key_path(root: &Path, key: &str) -> PathBuf {
    let fan = key.get(..2).unwrap_or(key);
    root.join(fan).join(format!("{}.bin", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_string() {
        let plugin = ContentSource::Plugin {
            name: "Skyrim.ESM".to_string(),
            local_form_id: 0x7,
        };
        assert_eq!(plugin.key_string("NPC L Breast"), "7.skyrim.esm.NPC L Breast");

        let raw = ContentSource::Raw { form_id: 0xFF000800 };
        assert_eq!(raw.key_string("NPC Belly"), "4278192128.NPC Belly");
    }

    #[test]
    fn test_cache_key_is_stable_and_distinct() {
        let a = ContentSource::Plugin {
            name: "Outfit.esp".to_string(),
            local_form_id: 42,
        };
        let b = ContentSource::Plugin {
            name: "OUTFIT.ESP".to_string(),
            local_form_id: 42,
        };

        let key = a.cache_key("NPC Belly");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(key, b.cache_key("NPC Belly"));
        assert_ne!(key, a.cache_key("NPC Pelvis"));
        assert_ne!(key, ContentSource::Raw { form_id: 42 }.cache_key("NPC Belly"));
    }

    #[test]
    fn test_relative_path_fans_out() {
        let src = ContentSource::Raw { form_id: 1 };
        let key = src.cache_key("n");
        let path = src.relative_path("n");

        assert_eq!(path, PathBuf::from(&key[..2]).join(format!("{}.bin", key)));
        assert_eq!(key_path(Path::new("/data"), &key).parent().unwrap(), Path::new("/data").join(&key[..2]));
    }
}
