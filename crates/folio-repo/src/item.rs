//! Item identifiers and live item handles

use crate::path::ItemPath;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a node
///
/// Survives moves and renames, unlike the node's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generate a fresh random identifier
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Live snapshot of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHandle {
    /// Stable identifier
    pub id: ItemId,
    /// Path at the time the handle was obtained
    pub path: ItemPath,
    /// Primary node type, e.g. `hippostd:folder`
    pub primary_type: String,
    /// Whether the node supports canonical-node projection
    pub projectable: bool,
}

impl NodeHandle {
    /// Node name (last path segment, empty for the root)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }
}

/// Live snapshot of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyHandle {
    /// Full property path (owning node path + property name)
    pub path: ItemPath,
    /// Identifier of the owning node
    pub parent_id: ItemId,
    /// Property value
    pub value: serde_json::Value,
}

/// Any repository item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    /// Container item
    Node(NodeHandle),
    /// Leaf value
    Property(PropertyHandle),
}

impl Item {
    /// Path of the item
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ItemPath {
        match self {
            Self::Node(node) => &node.path,
            Self::Property(prop) => &prop.path,
        }
    }

    /// Node handle if this item is a node
    #[inline]
    #[must_use]
    pub fn as_node(&self) -> Option<&NodeHandle> {
        match self {
            Self::Node(node) => Some(node),
            Self::Property(_) => None,
        }
    }

    /// Consume into a node handle if this item is a node
    #[inline]
    #[must_use]
    pub fn into_node(self) -> Option<NodeHandle> {
        match self {
            Self::Node(node) => Some(node),
            Self::Property(_) => None,
        }
    }

    /// Check if this item is a node
    #[inline]
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

impl From<NodeHandle> for Item {
    fn from(node: NodeHandle) -> Self {
        Self::Node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_roundtrips_through_string() {
        let id = ItemId::generate();
        let parsed: ItemId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn item_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<ItemId>().is_err());
    }

    #[test]
    fn item_accessors() {
        let node = NodeHandle {
            id: ItemId::generate(),
            path: "/content/news".parse().unwrap(),
            primary_type: "hippostd:folder".into(),
            projectable: true,
        };
        assert_eq!(node.name(), "news");

        let item = Item::from(node.clone());
        assert!(item.is_node());
        assert_eq!(item.path(), &node.path);
        assert_eq!(item.as_node(), Some(&node));

        let prop = Item::Property(PropertyHandle {
            path: "/content/news/title".parse().unwrap(),
            parent_id: node.id,
            value: serde_json::json!("News"),
        });
        assert!(!prop.is_node());
        assert!(prop.into_node().is_none());
    }
}
