//! Case-insensitive string keys.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string that compares, hashes and orders ignoring ASCII case.
///
/// The original spelling is kept for display and serialization.
#[derive(Debug, Clone, Default)]
pub struct CiString(String);

impl CiString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for CiString {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CiString {}

impl PartialEq<str> for CiString {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for CiString {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for CiString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl Ord for CiString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl PartialOrd for CiString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CiString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CiString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CiString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'a> From<Cow<'a, str>> for CiString {
    fn from(s: Cow<'a, str>) -> Self {
        Self(s.into_owned())
    }
}

impl Serialize for CiString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CiString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_case_insensitive_eq_and_hash() {
        let mut map = HashMap::new();
        map.insert(CiString::from("Stiffness"), 1);
        assert_eq!(map.get(&CiString::from("STIFFNESS")), Some(&1));
        assert_eq!(CiString::from("damping"), "DAMPING");
        assert_ne!(CiString::from("damping"), CiString::from("damping2"));
    }

    #[test]
    fn test_ordering_ignores_case() {
        let mut map = BTreeMap::new();
        map.insert(CiString::from("beta"), ());
        map.insert(CiString::from("Alpha"), ());
        map.insert(CiString::from("GAMMA"), ());

        let keys: Vec<&str> = map.keys().map(CiString::as_str).collect();
        assert_eq!(keys, vec!["Alpha", "beta", "GAMMA"]);
    }

    #[test]
    fn test_keeps_original_spelling() {
        let k = CiString::from("MaxOffsetX");
        assert_eq!(k.to_string(), "MaxOffsetX");
        assert_eq!(serde_json::to_string(&k).unwrap(), "\"MaxOffsetX\"");
    }
}
