//! Distinguished names.
//!
//! A [`Dn`] is an already-parsed hierarchical identifier: an ordered sequence
//! of naming components stored leaf first (`uid=bob` before `dc=com`).
//! Parsing, normalization, and escaping happen upstream; components are
//! treated as opaque, pre-normalized strings here.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RenameError;

/// A distinguished name: the position of an entry in the naming hierarchy.
///
/// Equality is structural (component-wise). Values are immutable; operations
/// that change the position, such as [`Dn::rename`], produce a new `Dn`.
///
/// The [`Ord`] implementation is hierarchical: a DN sorts before every one of
/// its descendants, and a subtree occupies a contiguous run in that order.
/// Unrelated DNs are ordered by comparing components root to leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dn {
    /// Naming components, leaf to root.
    components: Vec<String>,
}

impl Dn {
    /// Creates a DN from components ordered leaf to root.
    pub fn from_components(components: Vec<String>) -> Self {
        Self { components }
    }

    /// The root DN with no components, ancestor of every other DN.
    pub fn root() -> Self {
        Self { components: Vec::new() }
    }

    /// Returns the components, leaf first.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Whether this is the root DN.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns the immediate superior, or `None` for the root DN and for
    /// top-level entries.
    pub fn parent(&self) -> Option<Dn> {
        if self.components.len() < 2 {
            return None;
        }
        Some(Dn { components: self.components[1..].to_vec() })
    }

    /// Whether this DN equals `other` or lies below it in the hierarchy.
    ///
    /// `other`'s component sequence must be a suffix of this DN's sequence;
    /// every DN is a descendant of itself.
    pub fn is_descendant_of(&self, other: &Dn) -> bool {
        let offset = match self.components.len().checked_sub(other.components.len()) {
            Some(offset) => offset,
            None => return false,
        };
        self.components[offset..] == other.components[..]
    }

    /// Whether this DN equals `other` or lies above it in the hierarchy.
    pub fn is_ancestor_of(&self, other: &Dn) -> bool {
        other.is_descendant_of(self)
    }

    /// Computes this DN's new form after the subtree rooted at `from` is
    /// renamed to `to`.
    ///
    /// The `from` suffix is replaced by `to`; components below the renamed
    /// node are preserved. `from` renames to exactly `to`.
    ///
    /// # Errors
    ///
    /// Returns [`RenameError::NotDescendant`] if this DN does not lie under
    /// `from`, in which case no transform exists.
    pub fn rename(&self, from: &Dn, to: &Dn) -> Result<Dn, RenameError> {
        if !self.is_descendant_of(from) {
            return Err(RenameError::NotDescendant { dn: self.clone(), root: from.clone() });
        }
        let kept = self.components.len() - from.components.len();
        let mut components = Vec::with_capacity(kept + to.components.len());
        components.extend_from_slice(&self.components[..kept]);
        components.extend_from_slice(&to.components);
        Ok(Dn { components })
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    /// Hierarchical order: ancestors before descendants, then root-to-leaf
    /// component comparison for unrelated DNs.
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.iter().rev().cmp(other.components.iter().rev())
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(component)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = Infallible;

    /// Splits on commas, taking each component verbatim after trimming
    /// surrounding whitespace. Escaped commas are not supported; callers
    /// needing full RFC 4514 parsing must parse upstream and use
    /// [`Dn::from_components`]. An empty string yields the root DN.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Dn::root());
        }
        Ok(Dn {
            components: s.split(',').map(|c| c.trim().to_string()).collect(),
        })
    }
}
