use async_trait::async_trait;
use common::{
    error::IngestError,
    types::{Document, DocumentChunk},
};
use text_splitter::{Characters, ChunkCapacity, ChunkConfig, MarkdownSplitter, TextSplitter};

use super::{chunk_nodes, ChunkingStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterKind {
    Text,
    Markdown,
}

enum Splitter {
    Text(TextSplitter<Characters>),
    Markdown(MarkdownSplitter<Characters>),
}

/// Character-capacity chunking backed by `text-splitter`.
///
/// Chunks aim for `min_chars..=max_chars` characters, consecutive chunks of a
/// node sharing up to `overlap` characters.
pub struct SplitterChunking {
    splitter: Splitter,
}

impl SplitterChunking {
    pub fn new(
        kind: SplitterKind,
        min_chars: usize,
        max_chars: usize,
        overlap: usize,
    ) -> Result<Self, IngestError> {
        if min_chars == 0 || max_chars == 0 || min_chars > max_chars {
            return Err(IngestError::Validation(
                "invalid chunk character bounds; ensure 0 < min <= max".into(),
            ));
        }

        if overlap >= min_chars {
            return Err(IngestError::Validation(format!(
                "chunk_min_chars must be greater than the configured overlap of {overlap}"
            )));
        }

        let capacity = ChunkCapacity::new(min_chars)
            .with_max(max_chars)
            .map_err(|e| IngestError::Validation(format!("invalid chunk character bounds: {e}")))?;
        let chunk_config = ChunkConfig::new(capacity)
            .with_overlap(overlap)
            .map_err(|e| IngestError::Validation(format!("invalid chunk overlap: {e}")))?;

        let splitter = match kind {
            SplitterKind::Text => Splitter::Text(TextSplitter::new(chunk_config)),
            SplitterKind::Markdown => Splitter::Markdown(MarkdownSplitter::new(chunk_config)),
        };

        Ok(Self { splitter })
    }

    fn split(&self, text: &str) -> Vec<String> {
        match &self.splitter {
            Splitter::Text(splitter) => splitter.chunks(text).map(str::to_owned).collect(),
            Splitter::Markdown(splitter) => splitter.chunks(text).map(str::to_owned).collect(),
        }
    }
}

#[async_trait]
impl ChunkingStrategy for SplitterChunking {
    fn chunk(&self, document: &Document) -> Result<Vec<DocumentChunk>, IngestError> {
        Ok(chunk_nodes(document, |text| self.split(text)))
    }
}
