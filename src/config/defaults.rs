//! Built-in settings (layer 1)

use serde::{Deserialize, Serialize};

/// Default bone-cast cache budget: 64 MiB.
pub const DEFAULT_MAX_CACHE_BYTES: u64 = 64 * 1024 * 1024;

/// Built-in default setting values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Root of the per-key geometry files (default: "data/bonecast")
    pub bonecast_data_dir: String,

    /// Soft limit on cached geometry bytes (default: 64 MiB)
    pub bonecast_max_cache_bytes: u64,

    /// Gzip geometry files (default: true)
    pub bonecast_compress: bool,

    /// Root of armor override files (default: "data/armor")
    pub armor_data_dir: String,

    /// Log filter used when RUST_LOG is unset (default: "info")
    pub logging_level: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            bonecast_data_dir: "data/bonecast".to_string(),
            bonecast_max_cache_bytes: DEFAULT_MAX_CACHE_BYTES,
            bonecast_compress: true,
            armor_data_dir: "data/armor".to_string(),
            logging_level: "info".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "bonecast": {
                "data_dir": self.bonecast_data_dir,
                "max_cache_bytes": self.bonecast_max_cache_bytes,
                "compress": self.bonecast_compress
            },
            "armor": {
                "data_dir": self.armor_data_dir
            },
            "logging": {
                "level": self.logging_level
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.bonecast_data_dir, "data/bonecast");
        assert_eq!(defaults.bonecast_max_cache_bytes, 67_108_864);
        assert!(defaults.bonecast_compress);
        assert_eq!(defaults.armor_data_dir, "data/armor");
        assert_eq!(defaults.logging_level, "info");
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["bonecast"]["max_cache_bytes"], 67_108_864);
        assert_eq!(value["bonecast"]["compress"], true);
        assert_eq!(value["armor"]["data_dir"], "data/armor");
    }
}
