//! Repository item paths
//!
//! Provides [`ItemPath`] for absolute, hierarchical addressing of nodes and
//! properties in the content tree.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Absolute path of an item in the content tree
///
/// Segments are separated by `/`. The root is `/` and has no segments.
///
/// # Examples
/// - `["content", "documents"]` → `/content/documents`
/// - `["content", "gallery", "hippogallery:thumbnail"]` →
///   `/content/gallery/hippogallery:thumbnail`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ItemPath(Vec<String>);

impl ItemPath {
    /// The root path `/`
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from already validated segments
    ///
    /// # Errors
    /// Returns error if any segment is not a legal item name
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(|seg| {
                let seg = seg.into();
                validate_segment(&seg)?;
                Ok(seg)
            })
            .collect::<Result<Vec<_>, PathError>>()?;
        Ok(Self(segments))
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments below the root
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the root path
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Item name (last segment), `None` for the root
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning new path
    ///
    /// # Errors
    /// Returns error if `name` is not a legal item name
    pub fn child(&self, name: impl Into<String>) -> Result<Self, PathError> {
        let name = name.into();
        validate_segment(&name)?;
        let mut new = self.clone();
        new.0.push(name);
        Ok(new)
    }

    /// Check if this path is a prefix of another (or equal to it)
    ///
    /// # Examples
    /// - `/content` is prefix of `/content/documents`
    /// - `/content` is NOT prefix of `/contents`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if this path is a strict ancestor of another
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Segments leading from `ancestor` down to this path
    ///
    /// # Errors
    /// Returns error if `self` is not at or below `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Vec<String>, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(self.0[ancestor.0.len()..].to_vec())
    }

    /// Replace the `from` prefix of this path by `to`
    ///
    /// Used to rewrite descendant paths after a move. Returns `None` when
    /// `from` is not a prefix of this path.
    #[must_use]
    pub fn rebase(&self, from: &Self, to: &Self) -> Option<Self> {
        if !from.is_prefix_of(self) {
            return None;
        }
        let mut segments = to.0.clone();
        segments.extend_from_slice(&self.0[from.0.len()..]);
        Some(Self(segments))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn validate_segment(seg: &str) -> Result<(), PathError> {
    if seg.is_empty() {
        return Err(PathError::EmptySegment);
    }
    if seg == "." || seg == ".." || seg.contains(['/', '[', ']', '*', '|']) {
        return Err(PathError::InvalidSegment(seg.to_string()));
    }
    Ok(())
}

impl Display for ItemPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for ItemPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err(PathError::NotAbsolute(s.to_string()));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        Self::from_segments(rest.split('/'))
    }
}

impl Serialize for ItemPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors related to item paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Path does not start at the root
    #[error("path '{0}' is not absolute")]
    NotAbsolute(String),

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Segment that cannot name an item
    #[error("invalid item name: '{0}'")]
    InvalidSegment(String),

    /// Not a descendant path
    #[error("path '{path}' is not below '{ancestor}'")]
    NotDescendant { path: String, ancestor: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> ItemPath {
        s.parse().unwrap()
    }

    #[test]
    fn root_parses_and_displays() {
        let root = p("/");
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.to_string(), "/");
        assert!(root.name().is_none());
        assert!(root.parent().is_none());
    }

    #[test]
    fn namespaced_names_are_legal() {
        let path = p("/content/gallery/hippogallery:thumbnail");
        assert_eq!(path.name(), Some("hippogallery:thumbnail"));
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn relative_paths_are_rejected() {
        let result: Result<ItemPath, _> = "content/documents".parse();
        assert!(matches!(result, Err(PathError::NotAbsolute(_))));
    }

    #[test]
    fn empty_and_dot_segments_are_rejected() {
        assert!(matches!("/a//b".parse::<ItemPath>(), Err(PathError::EmptySegment)));
        assert!(matches!("/a/..".parse::<ItemPath>(), Err(PathError::InvalidSegment(_))));
        assert!(matches!("/a/b[2]".parse::<ItemPath>(), Err(PathError::InvalidSegment(_))));
        assert!(matches!("/a/".parse::<ItemPath>(), Err(PathError::EmptySegment)));
    }

    #[test]
    fn parent_and_child() {
        let path = p("/content/documents");
        assert_eq!(path.parent().unwrap(), p("/content"));
        assert_eq!(path.child("news").unwrap(), p("/content/documents/news"));
        assert!(path.child("a/b").is_err());
    }

    #[test]
    fn prefix_is_segment_aware() {
        assert!(p("/content").is_prefix_of(&p("/content/documents")));
        assert!(!p("/content").is_prefix_of(&p("/contents")));
        assert!(p("/content").is_prefix_of(&p("/content")));
        assert!(!p("/content").is_ancestor_of(&p("/content")));
        assert!(p("/").is_ancestor_of(&p("/content")));
    }

    #[test]
    fn relative_to_lists_remaining_segments() {
        let rel = p("/content/documents/news").relative_to(&p("/content")).unwrap();
        assert_eq!(rel, vec!["documents".to_string(), "news".to_string()]);
        assert!(p("/content/documents").relative_to(&p("/content/documents")).unwrap().is_empty());
        assert!(matches!(
            p("/other").relative_to(&p("/content")),
            Err(PathError::NotDescendant { .. })
        ));
    }

    #[test]
    fn rebase_rewrites_prefix() {
        let moved = p("/content/a/b/c").rebase(&p("/content/a"), &p("/archive/x")).unwrap();
        assert_eq!(moved, p("/archive/x/b/c"));
        assert!(p("/content/z").rebase(&p("/content/a"), &p("/archive")).is_none());
    }

    #[test]
    fn serde_uses_string_form() {
        let path = p("/content/documents");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/content/documents\"");
        let back: ItemPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    proptest! {
        #[test]
        fn display_parses_back(
            segments in proptest::collection::vec("[a-z][a-z0-9:_-]{0,8}", 0..6),
        ) {
            let path = ItemPath::from_segments(segments).unwrap();
            let reparsed: ItemPath = path.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, path);
        }
    }
}
