//! Names an override file may set.

use std::collections::HashMap;

use crate::entry::{ArmorCacheEntry, ArmorValue};
use crate::key::CiString;

/// A recognized override: the short key used on disk and the physics field it sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDesc {
    pub key: &'static str,
    pub field: &'static str,
}

const PHYSICS_VALUES: &[(&str, &str)] = &[
    ("s", "stiffness"),
    ("sq", "stiffness2"),
    ("ss", "springSlackOffset"),
    ("se", "springSlackMag"),
    ("d", "damping"),
    ("lx", "linearX"),
    ("ly", "linearY"),
    ("lz", "linearZ"),
    ("rx", "rotationalX"),
    ("ry", "rotationalY"),
    ("rz", "rotationalZ"),
    ("cox", "cogOffsetX"),
    ("coy", "cogOffsetY"),
    ("coz", "cogOffsetZ"),
    ("r", "resistance"),
    ("m", "mass"),
    ("mv", "maxVelocity"),
    ("gb", "gravityBias"),
    ("gc", "gravityCorrection"),
    ("rgc", "rotGravityCorrection"),
    ("crx", "colRotX"),
    ("cry", "colRotY"),
    ("crz", "colRotZ"),
    ("cb", "colRestitutionCoefficient"),
    ("cp", "colPenMass"),
    ("ce", "colPenBiasFactor"),
    ("cfr", "colFriction"),
    ("cm", "colPositionScale"),
    ("cr", "colRotationScale"),
    ("mox", "maxOffsetX"),
    ("moy", "maxOffsetY"),
    ("moz", "maxOffsetZ"),
    ("noc", "maxOffsetBoxVelocityDamping"),
    ("nod", "maxOffsetBoxStiffness"),
    ("noe", "maxOffsetBoxDamping"),
    ("nof", "maxOffsetBoxImpulseScale"),
    ("mor", "maxOffsetSphereRadius"),
    ("mosx", "maxOffsetSphereOffsetX"),
    ("mosy", "maxOffsetSphereOffsetY"),
    ("mosz", "maxOffsetSphereOffsetZ"),
    ("moc", "maxOffsetSphereVelocityDamping"),
    ("mod", "maxOffsetSphereStiffness"),
    ("moe", "maxOffsetSphereDamping"),
    ("mof", "maxOffsetSphereImpulseScale"),
];

/// Override names accepted when loading, matched case-insensitively.
///
/// Each value answers to both its short key and its field name.
#[derive(Debug, Clone, Default)]
pub struct ValueRegistry {
    descs: Vec<ValueDesc>,
    names: HashMap<CiString, usize>,
}

impl ValueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-component physics parameters.
    pub fn physics_defaults() -> Self {
        let mut registry = Self::new();
        for &(key, field) in PHYSICS_VALUES {
            registry.insert(ValueDesc { key, field });
        }
        registry
    }

    pub fn insert(&mut self, desc: ValueDesc) {
        let index = self.descs.len();
        self.descs.push(desc);
        self.names.insert(CiString::from(desc.key), index);
        self.names.insert(CiString::from(desc.field), index);
    }

    pub fn contains(&self, name: &CiString) -> bool {
        self.names.contains_key(name)
    }

    /// Whether `a` and `b` name the same value.
    pub fn same_value(&self, a: &CiString, b: &CiString) -> bool {
        match (self.names.get(a), self.names.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Override for `name` in `group`, under whichever alias it was stored.
    pub fn lookup<'a>(
        &self,
        entry: &'a ArmorCacheEntry,
        group: &str,
        name: &str,
    ) -> Option<&'a ArmorValue> {
        let values = entry.get(&CiString::from(group))?;
        let name = CiString::from(name);
        if let Some(value) = values.get(&name) {
            return Some(value);
        }
        values
            .iter()
            .find(|(stored, _)| self.same_value(stored, &name))
            .map(|(_, value)| value)
    }

    pub fn get(&self, name: &str) -> Option<&ValueDesc> {
        let index = *self.names.get(&CiString::from(name))?;
        self.descs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueDesc> {
        self.descs.iter()
    }

    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_defaults() {
        let registry = ValueRegistry::physics_defaults();
        assert_eq!(registry.len(), PHYSICS_VALUES.len());
        assert_eq!(registry.get("s").unwrap().field, "stiffness");
        assert_eq!(registry.get("MOX").unwrap().field, "maxOffsetX");
        assert_eq!(registry.get("Stiffness").unwrap().key, "s");
        assert!(registry.contains(&CiString::from("Sq")));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = ValueRegistry::new();
        assert!(registry.is_empty());
        registry.insert(ValueDesc {
            key: "bwt",
            field: "bcWeightThreshold",
        });
        assert!(registry.contains(&CiString::from("BWT")));
    }

    #[test]
    fn test_lookup_through_aliases() {
        let registry = ValueRegistry::physics_defaults();
        assert!(registry.same_value(&"S".into(), &"stiffness".into()));
        assert!(!registry.same_value(&"s".into(), &"sq".into()));
        assert!(!registry.same_value(&"s".into(), &"nope".into()));

        let mut entry = ArmorCacheEntry::new();
        entry
            .entry("Torso".into())
            .or_default()
            .insert("stiffness".into(), ArmorValue::absolute(12.5));

        assert_eq!(
            registry.lookup(&entry, "torso", "s"),
            Some(&ArmorValue::absolute(12.5))
        );
        assert_eq!(
            registry.lookup(&entry, "Torso", "Stiffness"),
            Some(&ArmorValue::absolute(12.5))
        );
        assert!(registry.lookup(&entry, "Torso", "sq").is_none());
        assert!(registry.lookup(&entry, "Belly", "s").is_none());
    }
}
