//! Search parameter and primer result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primer-BLAST search constraints keyed by form field name
///
/// Values stay strings even for numeric constraints because the service's
/// form is string-typed. Keys are case-sensitive and unique; inserting an
/// existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace a constraint
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Derive a copy with `key` set to `value`
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.insert(key, value);
        next
    }

    /// Derive a copy without `key`. Removing an absent key is a no-op.
    pub fn without(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.0.remove(key);
        next
    }

    /// Get a constraint value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate constraints in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Quality verdict of one resolved search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFlags {
    /// The template has no intron, so an intron-spanning search is meaningless
    pub has_no_intron: bool,

    /// No primer pair satisfied the constraints
    pub no_primers_found: bool,

    /// Every primer pair also amplifies unintended templates
    pub off_targets: bool,
}

impl QualityFlags {
    /// True when primers exist and at least one pair is specific
    pub fn is_acceptable(&self) -> bool {
        !self.no_primers_found && !self.off_targets
    }
}

/// One oligo of a primer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primer {
    /// Sequence, 5' to 3'
    pub sequence: String,

    /// Template strand ("Plus" or "Minus")
    pub strand: String,

    pub length: u32,
    pub start: u32,
    pub stop: u32,

    /// Melting temperature in °C
    pub tm: f64,

    pub gc_percent: f64,
    pub self_complementarity: f64,
    pub self_3prime_complementarity: f64,
}

/// A forward/reverse primer pair reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimerPair {
    /// 1-based rank as listed by the service
    pub rank: u32,
    pub forward: Primer,
    pub reverse: Primer,
    pub product_length: u32,
}
