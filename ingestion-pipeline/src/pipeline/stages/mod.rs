use chrono::Utc;
use common::{error::IngestError, types::Document};
use state_machines::core::GuardError;
use tracing::{debug, instrument};

use super::{
    context::PipelineContext,
    state::{Chunked, DocumentRead, Embedded, IngestionMachine, Ready},
};

#[instrument(level = "trace", skip_all, fields(locator = %ctx.locator))]
pub fn read_document(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), DocumentRead>, IngestError> {
    let document = ctx.reader.read(ctx.locator)?;
    record_document(ctx, document);

    machine
        .read()
        .map_err(|(_, guard)| map_guard_error("read", &guard))
}

#[instrument(level = "trace", skip_all, fields(locator = %ctx.locator))]
pub async fn read_document_async(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), DocumentRead>, IngestError> {
    let document = ctx.reader.read_async(ctx.locator).await?;
    record_document(ctx, document);

    machine
        .read()
        .map_err(|(_, guard)| map_guard_error("read", &guard))
}

#[instrument(level = "trace", skip_all, fields(locator = %ctx.locator))]
pub fn chunk_document(
    machine: IngestionMachine<(), DocumentRead>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Chunked>, IngestError> {
    let chunks = ctx.chunker.chunk(ctx.document()?)?;
    ctx.chunks = chunks;
    debug!(locator = %ctx.locator, chunk_count = ctx.chunks.len(), "document chunked");

    machine
        .chunk()
        .map_err(|(_, guard)| map_guard_error("chunk", &guard))
}

#[instrument(level = "trace", skip_all, fields(locator = %ctx.locator))]
pub async fn chunk_document_async(
    machine: IngestionMachine<(), DocumentRead>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Chunked>, IngestError> {
    let chunks = ctx.chunker.chunk_async(ctx.document()?).await?;
    ctx.chunks = chunks;
    debug!(locator = %ctx.locator, chunk_count = ctx.chunks.len(), "document chunked");

    machine
        .chunk()
        .map_err(|(_, guard)| map_guard_error("chunk", &guard))
}

#[instrument(level = "trace", skip_all, fields(locator = %ctx.locator))]
pub fn embed_chunks(
    machine: IngestionMachine<(), Chunked>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Embedded>, IngestError> {
    let contents = chunk_contents(ctx);
    let embeddings = ctx.embedder.embed(&contents)?;
    record_embeddings(ctx, embeddings)?;

    machine
        .embed()
        .map_err(|(_, guard)| map_guard_error("embed", &guard))
}

#[instrument(level = "trace", skip_all, fields(locator = %ctx.locator))]
pub async fn embed_chunks_async(
    machine: IngestionMachine<(), Chunked>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Embedded>, IngestError> {
    let contents = chunk_contents(ctx);
    let embeddings = ctx.embedder.embed_async(&contents).await?;
    record_embeddings(ctx, embeddings)?;

    machine
        .embed()
        .map_err(|(_, guard)| map_guard_error("embed", &guard))
}

fn record_document(ctx: &mut PipelineContext<'_>, document: Document) {
    let preview: String = document
        .nodes
        .first()
        .map(|node| node.content.chars().take(120).collect())
        .unwrap_or_default();

    tracing::info!(
        locator = %ctx.locator,
        document_id = %document.document_id,
        nodes = document.nodes.len(),
        text_chars = document.text_len(),
        "ingestion document read"
    );
    debug!(
        locator = %ctx.locator,
        preview = %preview.replace('\n', " "),
        "ingestion document preview"
    );

    ctx.document = Some(document);
}

fn chunk_contents(ctx: &PipelineContext<'_>) -> Vec<String> {
    ctx.chunks.iter().map(|chunk| chunk.content.clone()).collect()
}

/// One vector per chunk, each `dimension()` long.
fn record_embeddings(
    ctx: &mut PipelineContext<'_>,
    embeddings: Vec<Vec<f32>>,
) -> Result<(), IngestError> {
    ctx.created_at = Some(Utc::now());

    if embeddings.len() != ctx.chunks.len() {
        return Err(IngestError::EmbeddingMismatch {
            expected: ctx.chunks.len(),
            actual: embeddings.len(),
        });
    }

    let dimension = ctx.embedder.dimension();
    if let Some(vector) = embeddings.iter().find(|vector| vector.len() != dimension) {
        return Err(IngestError::EmbeddingMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }

    debug!(
        locator = %ctx.locator,
        chunk_count = embeddings.len(),
        dimension,
        "chunks embedded"
    );

    ctx.embeddings = embeddings;
    Ok(())
}

fn map_guard_error(event: &str, guard: &GuardError) -> IngestError {
    IngestError::Internal(format!(
        "invalid ingestion pipeline transition during {event}: {guard:?}"
    ))
}
