use serde::{Deserialize, Serialize};

/// A bounded span of text cut from one node. `node_chunk_index` is zero-based
/// and unique within `(document_id, node_path)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub document_id: String,
    pub node_path: String,
    pub node_chunk_index: usize,
    pub content: String,
}

impl DocumentChunk {
    pub fn new(
        document_id: impl Into<String>,
        node_path: impl Into<String>,
        node_chunk_index: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            node_path: node_path.into(),
            node_chunk_index,
            content: content.into(),
        }
    }
}
