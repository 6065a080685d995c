use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DocumentChunk;

pub const DEFAULT_MODALITY: &str = "text";

/// The only shape handed back to callers: a chunk plus its embedding, the
/// locator it was ingested from and when it was embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub document_id: String,
    pub source_uri: String,
    pub node_path: String,
    pub node_chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    pub modality: String,
    pub created_at: DateTime<Utc>,
}

impl EmbeddedChunk {
    pub fn from_chunk(
        chunk: DocumentChunk,
        source_uri: &str,
        embedding: Vec<f32>,
        modality: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        let DocumentChunk {
            document_id,
            node_path,
            node_chunk_index,
            content,
        } = chunk;

        Self {
            document_id,
            source_uri: source_uri.to_owned(),
            node_path,
            node_chunk_index,
            content,
            embedding,
            modality: modality.to_owned(),
            created_at,
        }
    }

    /// `source_uri#node_path#node_chunk_index`, unique per chunk.
    pub fn chunk_key(&self) -> String {
        format!(
            "{}#{}#{}",
            self.source_uri, self.node_path, self.node_chunk_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_key_joins_locator_path_and_index() {
        let chunk = DocumentChunk::new("doc-1", "intro", 1, "second piece");
        let embedded = EmbeddedChunk::from_chunk(
            chunk,
            "file:///tmp/notes.md",
            vec![0.5, 0.5],
            DEFAULT_MODALITY,
            Utc::now(),
        );

        assert_eq!(embedded.chunk_key(), "file:///tmp/notes.md#intro#1");
        assert_eq!(embedded.document_id, "doc-1");
        assert_eq!(embedded.modality, "text");
    }

    #[test]
    fn serializes_with_flat_field_names() {
        let embedded = EmbeddedChunk::from_chunk(
            DocumentChunk::new("doc-1", "1", 0, "hello"),
            "a.txt",
            vec![1.0],
            "markdown",
            Utc::now(),
        );

        let value = serde_json::to_value(&embedded).expect("serialize");
        assert_eq!(value["source_uri"], "a.txt");
        assert_eq!(value["node_chunk_index"], 0);
        assert_eq!(value["modality"], "markdown");
        assert!(value["created_at"].is_string());
    }
}
