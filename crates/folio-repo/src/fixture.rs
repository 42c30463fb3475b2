//! YAML content fixtures
//!
//! A fixture describes a content tree below the root:
//!
//! ```yaml
//! children:
//!   - name: content
//!     type: hippostd:folder
//!     properties:
//!       hippo:name: Content
//!     children:
//!       - name: documents
//!         type: hippostd:folder
//!       - name: by-tag
//!         projection_of: /content/documents
//! ```
//!
//! Projections must refer to nodes declared earlier in document order.

use crate::error::{RepoError, RepoResult};
use crate::memory::InMemoryRepository;
use crate::path::ItemPath;
use indexmap::IndexMap;
use serde::Deserialize;

/// One node of a fixture document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeFixture {
    /// Node name (ignored for the document root)
    #[serde(default)]
    pub name: String,

    /// Primary node type
    #[serde(rename = "type", default = "default_node_type")]
    pub primary_type: String,

    /// Properties set after the node is created
    #[serde(default)]
    pub properties: IndexMap<String, serde_json::Value>,

    /// Child nodes in document order
    #[serde(default)]
    pub children: Vec<NodeFixture>,

    /// Create a virtual node projecting this path
    #[serde(default)]
    pub projection_of: Option<ItemPath>,

    /// Create a virtual node without canonical counterpart
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,

    /// Whether the node supports canonical-node projection
    #[serde(default = "default_projectable")]
    pub projectable: bool,
}

fn default_node_type() -> String {
    "nt:unstructured".to_string()
}

fn default_projectable() -> bool {
    true
}

impl InMemoryRepository {
    /// Build a repository from a YAML fixture document
    ///
    /// # Errors
    /// Returns error if the document is malformed or describes an
    /// impossible tree
    pub fn from_yaml(yaml: &str) -> RepoResult<Self> {
        let root: NodeFixture =
            serde_yaml::from_str(yaml).map_err(|e| RepoError::Fixture(e.to_string()))?;
        let repo = Self::new()?;
        repo.load_fixture(&ItemPath::root(), &root)?;
        Ok(repo)
    }

    /// Create the children and properties of `fixture` below `at`
    ///
    /// # Errors
    /// Returns error if a node cannot be created
    pub fn load_fixture(&self, at: &ItemPath, fixture: &NodeFixture) -> RepoResult<()> {
        for (name, value) in &fixture.properties {
            self.set_property(at, name, value.clone())?;
        }

        for child in &fixture.children {
            let handle = if let Some(canonical) = &child.projection_of {
                self.add_projection(at, &child.name, Some(canonical))?
            } else if child.is_virtual {
                self.add_projection(at, &child.name, None)?
            } else if child.projectable {
                self.add_node(at, &child.name, &child.primary_type)?
            } else {
                self.add_plain_node(at, &child.name, &child.primary_type)?
            };
            self.load_fixture(&handle.path, child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;

    const FIXTURE: &str = r"
children:
  - name: content
    type: hippostd:folder
    properties:
      hippo:name: Content
    children:
      - name: documents
        type: hippostd:folder
        children:
          - name: news
            type: hippostd:folder
      - name: by-tag
        projection_of: /content/documents
      - name: search
        virtual: true
      - name: scratch
        projectable: false
";

    #[test]
    fn fixture_builds_tree() {
        let repo = InMemoryRepository::from_yaml(FIXTURE).unwrap();
        let news = repo
            .node_by_path(&"/content/documents/news".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(news.primary_type, "hippostd:folder");

        let title = repo
            .item_by_path(&"/content/hippo:name".parse().unwrap())
            .unwrap()
            .unwrap();
        assert!(!title.is_node());

        let scratch = repo
            .node_by_path(&"/content/scratch".parse().unwrap())
            .unwrap()
            .unwrap();
        assert!(!scratch.projectable);
        assert_eq!(scratch.primary_type, "nt:unstructured");
    }

    #[test]
    fn projection_points_at_canonical() {
        let repo = InMemoryRepository::from_yaml(FIXTURE).unwrap();
        let facet = repo
            .node_by_path(&"/content/by-tag".parse().unwrap())
            .unwrap()
            .unwrap();
        let canonical = repo.canonical_node(&facet).unwrap().unwrap();
        assert_eq!(canonical.path.to_string(), "/content/documents");
        assert_eq!(facet.primary_type, "hippostd:folder");
    }

    #[test]
    fn forward_projection_is_an_error() {
        let yaml = r"
children:
  - name: early
    projection_of: /later
  - name: later
";
        assert!(matches!(
            InMemoryRepository::from_yaml(yaml),
            Err(RepoError::NoSuchItem(_))
        ));
    }

    #[test]
    fn malformed_yaml_is_a_fixture_error() {
        assert!(matches!(
            InMemoryRepository::from_yaml("children: ["),
            Err(RepoError::Fixture(_))
        ));
        assert!(matches!(
            InMemoryRepository::from_yaml("unknown_key: 1"),
            Err(RepoError::Fixture(_))
        ));
    }
}
