use async_trait::async_trait;
use common::{
    error::IngestError,
    types::{Document, DocumentChunk},
};
use unicode_segmentation::UnicodeSegmentation;

use super::{chunk_nodes, ChunkingStrategy};

/// Sliding window over sentences: `sentences_per_chunk` sentences per chunk,
/// consecutive windows sharing `overlap` sentences.
#[derive(Debug, Clone, Copy)]
pub struct SentenceWindowChunking {
    sentences_per_chunk: usize,
    overlap: usize,
}

impl SentenceWindowChunking {
    pub fn new(sentences_per_chunk: usize, overlap: usize) -> Result<Self, IngestError> {
        if sentences_per_chunk == 0 {
            return Err(IngestError::Validation(
                "sentences_per_chunk must be at least 1".into(),
            ));
        }
        if overlap >= sentences_per_chunk {
            return Err(IngestError::Validation(format!(
                "sentence overlap {overlap} must be smaller than sentences_per_chunk {sentences_per_chunk}"
            )));
        }

        Ok(Self {
            sentences_per_chunk,
            overlap,
        })
    }

    fn split(&self, text: &str) -> Vec<String> {
        let sentences: Vec<&str> = text
            .split_sentence_bounds()
            .filter(|sentence| !sentence.trim().is_empty())
            .collect();
        let step = self.sentences_per_chunk.saturating_sub(self.overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0_usize;
        while start < sentences.len() {
            let end = start
                .saturating_add(self.sentences_per_chunk)
                .min(sentences.len());
            let window = sentences.get(start..end).unwrap_or_default();
            chunks.push(window.concat().trim().to_string());
            if end == sentences.len() {
                break;
            }
            start = start.saturating_add(step);
        }
        chunks
    }
}

impl Default for SentenceWindowChunking {
    fn default() -> Self {
        Self {
            sentences_per_chunk: 6,
            overlap: 2,
        }
    }
}

#[async_trait]
impl ChunkingStrategy for SentenceWindowChunking {
    fn chunk(&self, document: &Document) -> Result<Vec<DocumentChunk>, IngestError> {
        Ok(chunk_nodes(document, |text| self.split(text)))
    }
}

#[cfg(test)]
mod tests {
    use common::types::DocumentNode;

    use super::*;

    #[test]
    fn windows_overlap_by_the_configured_sentences() {
        let strategy = SentenceWindowChunking::new(3, 1).expect("strategy");
        let text = "One. Two. Three. Four. Five. Six.";

        assert_eq!(
            strategy.split(text),
            vec!["One. Two. Three.", "Three. Four. Five.", "Five. Six."]
        );
    }

    #[test]
    fn short_text_is_a_single_window() {
        let strategy = SentenceWindowChunking::default();
        assert_eq!(strategy.split("Just one sentence."), vec!["Just one sentence."]);
        assert!(strategy.split("  \n ").is_empty());
    }

    #[test]
    fn overlap_must_leave_progress() {
        assert!(matches!(
            SentenceWindowChunking::new(3, 3),
            Err(IngestError::Validation(_))
        ));
        assert!(matches!(
            SentenceWindowChunking::new(0, 0),
            Err(IngestError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn chunks_every_node_in_order() {
        let strategy = SentenceWindowChunking::new(2, 0).expect("strategy");
        let document = Document::new(
            "a.txt",
            vec![
                DocumentNode::new("1", "A one. A two. A three."),
                DocumentNode::new("2", "B one."),
            ],
        );

        let chunks = strategy.chunk_async(&document).await.expect("chunks");
        let keys: Vec<(&str, usize, &str)> = chunks
            .iter()
            .map(|c| (c.node_path.as_str(), c.node_chunk_index, c.content.as_str()))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("1", 0, "A one. A two."),
                ("1", 1, "A three."),
                ("2", 0, "B one."),
            ]
        );
    }
}
