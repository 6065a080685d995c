mod config;
mod context;
mod stages;
mod state;

pub use config::{IngestionConfig, IngestionTuning};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::IngestError,
    types::EmbeddedChunk,
    utils::{
        config::AppConfig,
        embedding::{EmbeddingModel, EmbeddingProvider},
    },
};
use futures::{stream, StreamExt, TryStreamExt};
use tracing::info;

use crate::{
    chunking::{self, ChunkingStrategy},
    documents::{ContentLoader, DefaultContentLoader, DocumentReader, ReaderDispatcher},
};

use self::{
    context::PipelineContext,
    stages::{
        chunk_document, chunk_document_async, embed_chunks, embed_chunks_async, read_document,
        read_document_async,
    },
    state::ready,
};

struct StageTimings {
    read: Duration,
    chunk: Duration,
    embed: Duration,
    total: Duration,
}

/// Reader → chunker → embedder, one locator at a time.
///
/// The pipeline holds no per-document state; every call builds its own
/// pipeline context, so one instance can serve concurrent callers.
#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    reader: Arc<dyn DocumentReader>,
    chunker: Arc<dyn ChunkingStrategy>,
    embedder: Arc<dyn EmbeddingModel>,
    pipeline_config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        reader: Arc<dyn DocumentReader>,
        chunker: Arc<dyn ChunkingStrategy>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self::with_config(reader, chunker, embedder, IngestionConfig::default())
    }

    pub fn with_config(
        reader: Arc<dyn DocumentReader>,
        chunker: Arc<dyn ChunkingStrategy>,
        embedder: Arc<dyn EmbeddingModel>,
        pipeline_config: IngestionConfig,
    ) -> Self {
        Self {
            reader,
            chunker,
            embedder,
            pipeline_config,
        }
    }

    /// Default dispatcher (markdown + text readers), configured chunker and
    /// embedding backend.
    pub async fn from_config(config: &AppConfig) -> Result<Self, IngestError> {
        let loader: Arc<dyn ContentLoader> = Arc::new(DefaultContentLoader::new());
        let reader = Arc::new(ReaderDispatcher::from_config(loader, config));
        let chunker = chunking::from_config(config)?;
        let embedder = EmbeddingProvider::from_config(config).await?;

        info!(
            readers = reader.len(),
            chunk_strategy = ?config.chunk_strategy,
            embedding_backend = embedder.backend_label(),
            dimension = embedder.dimension(),
            "ingestion pipeline configured"
        );

        Ok(Self::with_config(
            reader,
            chunker,
            Arc::new(embedder),
            IngestionConfig::from(config),
        ))
    }

    pub fn modality(&self) -> &str {
        &self.pipeline_config.modality
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.pipeline_config
    }

    fn context<'a>(&'a self, locator: &'a str) -> PipelineContext<'a> {
        PipelineContext::new(
            locator,
            &self.pipeline_config,
            self.reader.as_ref(),
            self.chunker.as_ref(),
            self.embedder.as_ref(),
        )
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    fn finish(
        ctx: PipelineContext<'_>,
        timings: &StageTimings,
    ) -> Result<Vec<EmbeddedChunk>, IngestError> {
        let locator = ctx.locator;
        let chunks = ctx.into_embedded_chunks()?;

        info!(
            %locator,
            chunk_count = chunks.len(),
            total_ms = Self::duration_millis(timings.total),
            read_ms = Self::duration_millis(timings.read),
            chunk_ms = Self::duration_millis(timings.chunk),
            embed_ms = Self::duration_millis(timings.embed),
            "ingestion pipeline finished"
        );

        Ok(chunks)
    }

    /// Ingests one locator, returning its embedded chunks in document order.
    #[tracing::instrument(skip_all, fields(locator = %locator))]
    pub fn ingest(&self, locator: &str) -> Result<Vec<EmbeddedChunk>, IngestError> {
        let mut ctx = self.context(locator);
        let machine = ready();

        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = read_document(machine, &mut ctx).map_err(|err| ctx.abort(err))?;
        let read = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = chunk_document(machine, &mut ctx).map_err(|err| ctx.abort(err))?;
        let chunk = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = embed_chunks(machine, &mut ctx).map_err(|err| ctx.abort(err))?;
        let embed = stage_start.elapsed();

        let timings = StageTimings {
            read,
            chunk,
            embed,
            total: pipeline_started.elapsed(),
        };
        Self::finish(ctx, &timings)
    }

    #[tracing::instrument(skip_all, fields(locator = %locator))]
    pub async fn ingest_async(&self, locator: &str) -> Result<Vec<EmbeddedChunk>, IngestError> {
        let mut ctx = self.context(locator);
        let machine = ready();

        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = read_document_async(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let read = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = chunk_document_async(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let chunk = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = embed_chunks_async(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let embed = stage_start.elapsed();

        let timings = StageTimings {
            read,
            chunk,
            embed,
            total: pipeline_started.elapsed(),
        };
        Self::finish(ctx, &timings)
    }

    /// Ingests locators one after another; the first failure ends the batch.
    #[tracing::instrument(skip_all, fields(documents = locators.len()))]
    pub fn ingest_batch<S: AsRef<str>>(
        &self,
        locators: &[S],
    ) -> Result<Vec<EmbeddedChunk>, IngestError> {
        let mut embedded = Vec::new();
        for locator in locators {
            embedded.extend(self.ingest(locator.as_ref())?);
        }

        info!(
            documents = locators.len(),
            chunk_count = embedded.len(),
            "ingestion batch finished"
        );
        Ok(embedded)
    }

    /// Ingests up to `batch_concurrency` locators at a time.
    ///
    /// Output keeps input order regardless of completion order. The first
    /// failure in input order is returned and the remaining in-flight work is
    /// dropped.
    #[tracing::instrument(
        skip_all,
        fields(documents = locators.len(), concurrency = self.pipeline_config.tuning.batch_concurrency)
    )]
    pub async fn ingest_batch_async<S: AsRef<str> + Sync>(
        &self,
        locators: &[S],
    ) -> Result<Vec<EmbeddedChunk>, IngestError> {
        let concurrency = self.pipeline_config.tuning.batch_concurrency.max(1);

        let per_document: Vec<Vec<EmbeddedChunk>> = stream::iter(locators)
            .map(|locator| self.ingest_async(locator.as_ref()))
            .buffered(concurrency)
            .try_collect()
            .await?;

        let embedded: Vec<EmbeddedChunk> = per_document.into_iter().flatten().collect();
        info!(
            documents = locators.len(),
            chunk_count = embedded.len(),
            "ingestion batch finished"
        );
        Ok(embedded)
    }
}
