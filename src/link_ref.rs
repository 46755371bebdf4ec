//! The reference map: link reference definitions collected during the
//! block phase and consumed by the inline phase.

use rustc_hash::FxBuildHasher;
use std::collections::HashMap;

/// A link reference definition (URL + optional title), already
/// entity/backslash-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub url: String,
    pub title: String,
}

/// Store of link reference definitions, keyed by normalized label.
/// First definition wins.
#[derive(Debug, Default)]
pub struct RefMap {
    map: HashMap<String, Reference, FxBuildHasher>,
}

impl RefMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition if the label is new.
    pub fn insert(&mut self, normalized_label: String, reference: Reference) {
        self.map.entry(normalized_label).or_insert(reference);
    }

    pub fn lookup(&self, normalized_label: &str) -> Option<&Reference> {
        self.map.get(normalized_label)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}
