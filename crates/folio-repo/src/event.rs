//! Repository change events and subscription filters
//!
//! Every write to the repository produces one [`RawEvent`] per affected
//! item. Listeners subscribe with an [`EventFilter`] that selects events by
//! kind, by the location of the associated parent node, and optionally by
//! the parent's identifier or primary type.

use crate::item::ItemId;
use crate::path::ItemPath;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a single change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A node was created
    NodeAdded,
    /// A node (and its subtree) was removed
    NodeRemoved,
    /// A node was moved or renamed
    NodeMoved,
    /// A property was created
    PropertyAdded,
    /// A property was removed
    PropertyRemoved,
    /// A property value was replaced
    PropertyChanged,
}

impl EventKind {
    /// Mask flag selecting this kind
    #[inline]
    #[must_use]
    pub const fn mask(self) -> EventMask {
        match self {
            Self::NodeAdded => EventMask::NODE_ADDED,
            Self::NodeRemoved => EventMask::NODE_REMOVED,
            Self::NodeMoved => EventMask::NODE_MOVED,
            Self::PropertyAdded => EventMask::PROPERTY_ADDED,
            Self::PropertyRemoved => EventMask::PROPERTY_REMOVED,
            Self::PropertyChanged => EventMask::PROPERTY_CHANGED,
        }
    }

    /// Check if this is a node-level (structural) event
    #[inline]
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::NodeAdded | Self::NodeRemoved | Self::NodeMoved)
    }
}

bitflags! {
    /// Set of event kinds a listener is interested in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EventMask: u32 {
        /// [`EventKind::NodeAdded`]
        const NODE_ADDED       = 0b0000_0001;
        /// [`EventKind::NodeRemoved`]
        const NODE_REMOVED     = 0b0000_0010;
        /// [`EventKind::PropertyAdded`]
        const PROPERTY_ADDED   = 0b0000_0100;
        /// [`EventKind::PropertyRemoved`]
        const PROPERTY_REMOVED = 0b0000_1000;
        /// [`EventKind::PropertyChanged`]
        const PROPERTY_CHANGED = 0b0001_0000;
        /// [`EventKind::NodeMoved`]
        const NODE_MOVED       = 0b0010_0000;
    }
}

impl EventMask {
    /// Node added, removed or moved.
    pub const STRUCTURE: Self = Self::NODE_ADDED
        .union(Self::NODE_REMOVED)
        .union(Self::NODE_MOVED);

    /// Property added, removed or changed.
    pub const PROPERTIES: Self = Self::PROPERTY_ADDED
        .union(Self::PROPERTY_REMOVED)
        .union(Self::PROPERTY_CHANGED);

    /// Every event kind.
    pub const ALL: Self = Self::STRUCTURE.union(Self::PROPERTIES);
}

/// One change notification as delivered by the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// What happened
    pub kind: EventKind,
    /// Path of the affected item (destination path for moves)
    pub path: ItemPath,
    /// Affected node, or the owning node for property events
    pub identifier: ItemId,
    /// Identifier of the associated parent node
    pub parent_id: ItemId,
    /// Primary type of the associated parent node
    pub parent_type: String,
    /// Session user that performed the write
    pub user_id: String,
    /// Time of the write
    pub date: DateTime<Utc>,
    /// Source path for [`EventKind::NodeMoved`]
    pub moved_from: Option<ItemPath>,
}

impl RawEvent {
    /// Path of the node the event is associated with for filtering
    ///
    /// For node events this is the parent of the affected node, for property
    /// events it is the node owning the property.
    #[inline]
    #[must_use]
    pub fn associated_parent_path(&self) -> ItemPath {
        self.path.parent().unwrap_or_default()
    }
}

/// Subscription filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Event kinds to deliver
    pub mask: EventMask,
    /// Scope path
    pub scope: ItemPath,
    /// Include events anywhere below `scope`, not just direct children
    pub deep: bool,
    /// Only events whose associated parent has one of these ids
    pub ids: Option<Vec<ItemId>>,
    /// Only events whose associated parent has one of these primary types
    pub node_types: Option<Vec<String>>,
}

impl EventFilter {
    /// Create a filter for `mask` under `scope`
    #[inline]
    #[must_use]
    pub fn new(mask: EventMask, scope: ItemPath, deep: bool) -> Self {
        Self {
            mask,
            scope,
            deep,
            ids: None,
            node_types: None,
        }
    }

    /// Restrict to parent node identifiers
    #[inline]
    #[must_use]
    pub fn with_ids(mut self, ids: Vec<ItemId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Restrict to parent node types
    #[inline]
    #[must_use]
    pub fn with_node_types(mut self, node_types: Vec<String>) -> Self {
        self.node_types = Some(node_types);
        self
    }

    /// Check if an event passes this filter
    ///
    /// Besides events whose associated parent is in scope, a move whose
    /// source parent is in scope passes, as does the removal or move of the
    /// scope node itself or one of its ancestors.
    #[must_use]
    pub fn matches(&self, event: &RawEvent) -> bool {
        if !self.mask.contains(event.kind.mask()) {
            return false;
        }
        if !self.in_scope(event) {
            return false;
        }

        if let Some(ids) = &self.ids {
            if !ids.contains(&event.parent_id) {
                return false;
            }
        }

        if let Some(types) = &self.node_types {
            if !types.iter().any(|t| t == &event.parent_type) {
                return false;
            }
        }

        true
    }

    fn covers(&self, parent: &ItemPath) -> bool {
        if self.deep {
            self.scope.is_prefix_of(parent)
        } else {
            &self.scope == parent
        }
    }

    fn in_scope(&self, event: &RawEvent) -> bool {
        if self.covers(&event.associated_parent_path()) {
            return true;
        }
        match event.kind {
            EventKind::NodeRemoved => event.path.is_prefix_of(&self.scope),
            EventKind::NodeMoved => event.moved_from.as_ref().is_some_and(|from| {
                from.is_prefix_of(&self.scope)
                    || from.parent().is_some_and(|parent| self.covers(&parent))
            }),
            _ => false,
        }
    }
}
