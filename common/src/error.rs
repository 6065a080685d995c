use config::ConfigError;
use thiserror::Error;
use tokio::task::JoinError;

/// Failure kinds surfaced by the ingestion core.
///
/// Collaborator failures keep their own variant all the way up to the caller,
/// so a missing document can be told apart from a missing reader.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No registered reader can handle locator: {0}")]
    NoReaderAvailable(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Chunking error: {0}")]
    Chunking(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Embedding mismatch: expected {expected}, got {actual}")]
    EmbeddingMismatch { expected: usize, actual: usize },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal service error: {0}")]
    Internal(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
}

impl IngestError {
    /// Whether retrying the same locator later may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::DocumentNotFound(_) | Self::Io(_) | Self::Join(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reader_error_names_the_locator() {
        let err = IngestError::NoReaderAvailable("path/to/unknown.xyz".into());
        assert!(err.to_string().contains("path/to/unknown.xyz"));
        assert!(!err.is_retriable());
    }

    #[test]
    fn missing_documents_are_retriable() {
        assert!(IngestError::DocumentNotFound("gone.txt".into()).is_retriable());
        assert!(!IngestError::Embedding("quota".into()).is_retriable());
        assert!(!IngestError::EmbeddingMismatch {
            expected: 3,
            actual: 2
        }
        .is_retriable());
    }

    #[test]
    fn io_errors_convert() {
        let err: IngestError = std::io::Error::other("disk on fire").into();
        assert!(matches!(err, IngestError::Io(_)));
        assert!(err.is_retriable());
    }
}
