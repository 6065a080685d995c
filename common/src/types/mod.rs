pub mod document;
pub mod document_chunk;
pub mod embedded_chunk;

pub use document::{Document, DocumentNode};
pub use document_chunk::DocumentChunk;
pub use embedded_chunk::{EmbeddedChunk, DEFAULT_MODALITY};
