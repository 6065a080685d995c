mod sentence;
mod splitter;

pub use sentence::SentenceWindowChunking;
pub use splitter::{SplitterChunking, SplitterKind};

use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::IngestError,
    types::{Document, DocumentChunk},
    utils::config::{AppConfig, ChunkStrategyKind},
};

/// Cuts a document into chunks, node by node.
///
/// Output follows node order, then chunk order within a node, with
/// `node_chunk_index` restarting at zero for every node.
#[async_trait]
pub trait ChunkingStrategy: Send + Sync {
    fn chunk(&self, document: &Document) -> Result<Vec<DocumentChunk>, IngestError>;

    async fn chunk_async(&self, document: &Document) -> Result<Vec<DocumentChunk>, IngestError> {
        self.chunk(document)
    }
}

pub fn from_config(config: &AppConfig) -> Result<Arc<dyn ChunkingStrategy>, IngestError> {
    let strategy: Arc<dyn ChunkingStrategy> = match config.chunk_strategy {
        ChunkStrategyKind::Text => Arc::new(SplitterChunking::new(
            SplitterKind::Text,
            config.chunk_min_chars,
            config.chunk_max_chars,
            config.chunk_overlap,
        )?),
        ChunkStrategyKind::Markdown => Arc::new(SplitterChunking::new(
            SplitterKind::Markdown,
            config.chunk_min_chars,
            config.chunk_max_chars,
            config.chunk_overlap,
        )?),
        ChunkStrategyKind::Sentence => Arc::new(SentenceWindowChunking::new(
            config.sentences_per_chunk,
            config.sentence_overlap,
        )?),
    };
    Ok(strategy)
}

/// Applies `split` to every node and numbers the pieces per node.
fn chunk_nodes<F>(document: &Document, mut split: F) -> Vec<DocumentChunk>
where
    F: FnMut(&str) -> Vec<String>,
{
    document
        .nodes
        .iter()
        .flat_map(|node| {
            split(&node.content)
                .into_iter()
                .enumerate()
                .map(|(index, content)| {
                    DocumentChunk::new(
                        document.document_id.as_str(),
                        node.node_path.as_str(),
                        index,
                        content,
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use common::types::DocumentNode;

    use super::*;

    #[test]
    fn indices_restart_per_node_and_empty_nodes_contribute_nothing() {
        let document = Document::with_id(
            "doc",
            "a.txt",
            vec![
                DocumentNode::new("1", "a b c"),
                DocumentNode::new("2", ""),
                DocumentNode::new("3", "d e"),
            ],
        );

        let chunks = chunk_nodes(&document, |text| {
            text.split_whitespace().map(ToString::to_string).collect()
        });

        let keys: Vec<(&str, usize, &str)> = chunks
            .iter()
            .map(|c| (c.node_path.as_str(), c.node_chunk_index, c.content.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("1", 0, "a"),
                ("1", 1, "b"),
                ("1", 2, "c"),
                ("3", 0, "d"),
                ("3", 1, "e"),
            ]
        );
        assert!(chunks.iter().all(|c| c.document_id == "doc"));
    }

    #[test]
    fn builds_every_configured_strategy() {
        for kind in [
            ChunkStrategyKind::Text,
            ChunkStrategyKind::Markdown,
            ChunkStrategyKind::Sentence,
        ] {
            let config = AppConfig {
                chunk_strategy: kind,
                ..AppConfig::default()
            };
            let strategy = from_config(&config).expect("strategy");
            let document =
                Document::new("a.txt", vec![DocumentNode::new("1", "One sentence. Two.")]);
            let chunks = strategy.chunk(&document).expect("chunks");
            assert_eq!(chunks.len(), 1, "{kind:?}");
        }
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = AppConfig {
            chunk_min_chars: 10,
            chunk_max_chars: 5,
            ..AppConfig::default()
        };
        assert!(matches!(
            from_config(&config),
            Err(IngestError::Validation(_))
        ));

        let config = AppConfig {
            chunk_strategy: ChunkStrategyKind::Sentence,
            sentences_per_chunk: 2,
            sentence_overlap: 2,
            ..AppConfig::default()
        };
        assert!(matches!(
            from_config(&config),
            Err(IngestError::Validation(_))
        ));
    }
}
