//! Layered settings
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Optional TOML settings file
//! 3. CLI overrides

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, DEFAULT_MAX_CACHE_BYTES};
pub use effective::{
    ArmorSettings, BoneCastSettings, EffectiveSettings, LoggingSettings, Settings, SettingsError,
    SettingsOrigin, SettingsSource,
};
pub use merge::{deep_merge, merge_layers};
