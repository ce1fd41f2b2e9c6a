//! Map over distinguished names with subtree removal.
//!
//! Keys use [`Dn`]'s hierarchical order, under which a DN and all of its
//! descendants occupy one contiguous run. Subtree removal is therefore an
//! ordered range scan starting at the root, stopping at the first key outside
//! the subtree, rather than a walk over the whole map.

use std::collections::BTreeMap;

use arbordir_types::Dn;

/// A mapping keyed by DNs, indexed for efficient subtree operations.
///
/// At most one value is stored per distinct key. No ordering is implied
/// between unrelated keys.
#[derive(Debug, Clone)]
pub struct DitMap<V> {
    entries: BTreeMap<Dn, V>,
}

impl<V> DitMap<V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Exact-match lookup.
    pub fn get(&self, dn: &Dn) -> Option<&V> {
        self.entries.get(dn)
    }

    /// Exact-match mutable lookup.
    pub fn get_mut(&mut self, dn: &Dn) -> Option<&mut V> {
        self.entries.get_mut(dn)
    }

    /// Inserts or replaces the value at `dn`, returning the replaced value.
    pub fn put(&mut self, dn: Dn, value: V) -> Option<V> {
        self.entries.insert(dn, value)
    }

    /// Removes the exact entry at `dn` if present.
    pub fn remove(&mut self, dn: &Dn) -> Option<V> {
        self.entries.remove(dn)
    }

    /// Removes every entry whose key equals `root` or descends from it,
    /// returning the removed entries paired with their original keys.
    ///
    /// Returns an empty collection when nothing under `root` is stored.
    pub fn remove_subtree(&mut self, root: &Dn) -> Vec<(Dn, V)> {
        let doomed: Vec<Dn> = self
            .entries
            .range(root..)
            .take_while(|(dn, _)| dn.is_descendant_of(root))
            .map(|(dn, _)| dn.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|dn| self.entries.remove(&dn).map(|value| (dn, value)))
            .collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over stored entries in hierarchical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Dn, &V)> {
        self.entries.iter()
    }
}

impl<V> Default for DitMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
