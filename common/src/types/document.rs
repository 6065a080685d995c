use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One addressable unit of document structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub node_path: String,
    pub content: String,
}

impl DocumentNode {
    pub fn new(node_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            content: content.into(),
        }
    }
}

/// A source after reading: an id, the locator it came from and its nodes in
/// document order.
///
/// Ids derive from the locator (UUIDv5 in the URL namespace), so reading the
/// same locator twice yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub source_uri: String,
    pub nodes: Vec<DocumentNode>,
}

impl Document {
    pub fn new(source_uri: impl Into<String>, nodes: Vec<DocumentNode>) -> Self {
        let source_uri = source_uri.into();
        Self {
            document_id: Uuid::new_v5(&Uuid::NAMESPACE_URL, source_uri.as_bytes()).to_string(),
            source_uri,
            nodes,
        }
    }

    pub fn with_id(
        document_id: impl Into<String>,
        source_uri: impl Into<String>,
        nodes: Vec<DocumentNode>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            source_uri: source_uri.into(),
            nodes,
        }
    }

    pub fn text_len(&self) -> usize {
        self.nodes.iter().map(|node| node.content.chars().count()).sum()
    }
}
