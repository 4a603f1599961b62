//! Permission tags.
//!
//! A node carries a set of tags; a caller presents its own set. Access needs
//! only one tag in common. A node with no tags is public.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag held by ordinary desktop sessions and every running application.
pub const USER: &str = "user";

/// Tag reserved for administrative callers.
pub const ADMINISTRATOR: &str = "administrator";

/// A set of permission tags, used both on nodes and by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// The empty set. On a node it means "anyone".
    #[must_use]
    pub fn public() -> Self {
        Self::default()
    }

    /// `{"user"}`.
    #[must_use]
    pub fn user() -> Self {
        Self::from_iter([USER])
    }

    /// `{"administrator"}`.
    #[must_use]
    pub fn administrator() -> Self {
        Self::from_iter([ADMINISTRATOR])
    }

    /// Whether the set holds no tags.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `tag` is in the set.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Whether the two sets share at least one tag.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.0.iter().any(|tag| other.0.contains(tag))
    }

    /// Whether a caller presenting `caller` may act on a node tagged `self`.
    #[must_use]
    pub fn admits(&self, caller: &Self) -> bool {
        self.is_public() || self.intersects(caller)
    }

    /// Iterate the tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_grants_access() {
        let node = PermissionSet::from_iter(["user", "administrator"]);
        assert!(node.admits(&PermissionSet::user()));
        assert!(node.admits(&PermissionSet::administrator()));
        assert!(!node.admits(&PermissionSet::from_iter(["guest"])));
    }

    #[test]
    fn test_untagged_node_is_public() {
        let node = PermissionSet::public();
        assert!(node.admits(&PermissionSet::from_iter(["guest"])));
        assert!(node.admits(&PermissionSet::public()));
    }

    #[test]
    fn test_empty_caller_cannot_reach_tagged_node() {
        assert!(!PermissionSet::user().admits(&PermissionSet::public()));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let set = PermissionSet::from_iter(["user"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["user"]"#);
        let back: PermissionSet = serde_json::from_str(r#"["b","a"]"#).unwrap();
        assert_eq!(back.to_string(), "[a, b]");
    }
}
