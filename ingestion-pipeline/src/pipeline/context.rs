use chrono::{DateTime, Utc};
use common::{
    error::IngestError,
    types::{Document, DocumentChunk, EmbeddedChunk},
    utils::embedding::EmbeddingModel,
};
use tracing::error;

use crate::{chunking::ChunkingStrategy, documents::DocumentReader};

use super::config::IngestionConfig;

/// Transient state of one `ingest` call. Dropped when the call returns.
pub struct PipelineContext<'a> {
    pub locator: &'a str,
    pub pipeline_config: &'a IngestionConfig,
    pub reader: &'a dyn DocumentReader,
    pub chunker: &'a dyn ChunkingStrategy,
    pub embedder: &'a dyn EmbeddingModel,
    pub document: Option<Document>,
    pub chunks: Vec<DocumentChunk>,
    pub embeddings: Vec<Vec<f32>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        locator: &'a str,
        pipeline_config: &'a IngestionConfig,
        reader: &'a dyn DocumentReader,
        chunker: &'a dyn ChunkingStrategy,
        embedder: &'a dyn EmbeddingModel,
    ) -> Self {
        Self {
            locator,
            pipeline_config,
            reader,
            chunker,
            embedder,
            document: None,
            chunks: Vec::new(),
            embeddings: Vec::new(),
            created_at: None,
        }
    }

    pub fn document(&self) -> Result<&Document, IngestError> {
        self.document
            .as_ref()
            .ok_or_else(|| IngestError::Internal("document expected to be available".into()))
    }

    pub fn abort(&self, err: IngestError) -> IngestError {
        error!(
            locator = %self.locator,
            reader = self.reader.name(),
            error = %err,
            "ingestion pipeline aborted"
        );
        err
    }

    /// Pairs chunks with their vectors by position.
    pub fn into_embedded_chunks(self) -> Result<Vec<EmbeddedChunk>, IngestError> {
        let created_at = self.created_at.ok_or_else(|| {
            IngestError::Internal("embedding timestamp expected to be available".into())
        })?;
        let locator = self.locator;
        let modality = self.pipeline_config.modality.as_str();

        Ok(self
            .chunks
            .into_iter()
            .zip(self.embeddings)
            .map(|(chunk, embedding)| {
                EmbeddedChunk::from_chunk(chunk, locator, embedding, modality, created_at)
            })
            .collect())
    }
}
