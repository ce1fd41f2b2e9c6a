//! Directory entry snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dn::Dn;

/// An immutable snapshot of a directory entry, as handed to the registry by
/// the operation pipeline after a commit.
///
/// Carries the entry's position ([`Dn`]) and its attributes at snapshot time.
/// Attribute values keep their server-side order; lookups are by exact
/// attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct Entry {
    /// Position of the entry in the naming hierarchy.
    dn: Dn,
    /// Attribute name to values.
    #[builder(default)]
    attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    /// Creates an entry snapshot with no attributes.
    pub fn new(dn: Dn) -> Self {
        Self { dn, attributes: BTreeMap::new() }
    }

    /// The entry's DN.
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Values of the named attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// Whether the named attribute is present.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// All attributes of the snapshot.
    pub fn attributes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.attributes
    }
}
