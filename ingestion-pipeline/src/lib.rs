#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod chunking;
pub mod documents;
pub mod pipeline;

pub use chunking::ChunkingStrategy;
pub use documents::{
    ContentLoader, DefaultContentLoader, DocumentReader, MarkdownDocumentReader, ReaderDispatcher,
    TextDocumentReader,
};
pub use pipeline::{IngestionConfig, IngestionPipeline, IngestionTuning};
