//! Override entries in lookup (hash) and listing (sorted) form.

use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::key::CiString;

/// How an override value combines with the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OverrideMode {
    /// Replace the configured value.
    Absolute = 0,
    /// Multiply the configured value.
    Modifier = 1,
    /// Reserved; carries no value on disk.
    Reserved = 2,
}

impl OverrideMode {
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::Absolute),
            1 => Some(Self::Modifier),
            2 => Some(Self::Reserved),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether the value is written alongside the tag.
    pub fn has_value(self) -> bool {
        !matches!(self, Self::Reserved)
    }
}

/// One override: mode tag plus scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmorValue {
    pub mode: OverrideMode,
    pub value: f32,
}

impl ArmorValue {
    pub fn new(mode: OverrideMode, value: f32) -> Self {
        Self { mode, value }
    }

    pub fn absolute(value: f32) -> Self {
        Self::new(OverrideMode::Absolute, value)
    }

    pub fn modifier(value: f32) -> Self {
        Self::new(OverrideMode::Modifier, value)
    }
}

/// Written as `[tag, value]`, or `[tag]` when the mode has no value.
impl Serialize for ArmorValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.mode.has_value() { 2 } else { 1 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.mode.tag())?;
        if self.mode.has_value() {
            seq.serialize_element(&self.value)?;
        }
        seq.end()
    }
}

/// Group name -> override name -> value.
pub type ArmorCacheEntry = HashMap<CiString, HashMap<CiString, ArmorValue>>;

/// Same data, ordered case-insensitively for listing.
pub type ArmorCacheEntrySorted = BTreeMap<CiString, BTreeMap<CiString, ArmorValue>>;

/// Replace `dst` with an independent sorted copy of `src`.
pub fn copy_to_sorted(src: &ArmorCacheEntry, dst: &mut ArmorCacheEntrySorted) {
    dst.clear();
    for (group, values) in src {
        let out = dst.entry(group.clone()).or_default();
        for (name, value) in values {
            out.entry(name.clone()).or_insert(*value);
        }
    }
}

/// Replace `dst` with an independent hashed copy of `src`.
pub fn copy_from_sorted(src: &ArmorCacheEntrySorted, dst: &mut ArmorCacheEntry) {
    dst.clear();
    for (group, values) in src {
        let out = dst.entry(group.clone()).or_default();
        for (name, value) in values {
            out.entry(name.clone()).or_insert(*value);
        }
    }
}

/// Look up one override, ignoring case in both names.
pub fn lookup<'a>(entry: &'a ArmorCacheEntry, group: &str, name: &str) -> Option<&'a ArmorValue> {
    entry
        .get(&CiString::from(group))?
        .get(&CiString::from(name))
}
