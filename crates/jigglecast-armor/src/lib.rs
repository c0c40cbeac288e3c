//! Per-armor physics overrides.
//!
//! An override file maps config groups to named scalar overrides. Files are
//! loaded lazily by path into an [`ArmorCache`] and kept until the cache is
//! dropped.

pub mod cache;
pub mod entry;
pub mod error;
pub mod key;
pub mod registry;

pub use cache::{parse_entry, serialize_entry, ArmorCache};
pub use entry::{
    copy_from_sorted, copy_to_sorted, lookup, ArmorCacheEntry, ArmorCacheEntrySorted, ArmorValue,
    OverrideMode,
};
pub use error::{ArmorCacheError, ArmorResult, ParseError};
pub use key::CiString;
pub use registry::{ValueDesc, ValueRegistry};
