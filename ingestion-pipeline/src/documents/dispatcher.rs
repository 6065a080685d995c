use std::sync::Arc;

use async_trait::async_trait;
use common::{error::IngestError, types::Document, utils::config::AppConfig};
use tracing::debug;

use super::{ContentLoader, DocumentReader, MarkdownDocumentReader, TextDocumentReader};

struct RegisteredReader {
    priority: i32,
    reader: Arc<dyn DocumentReader>,
}

/// Ordered set of readers; the first one whose `can_handle` accepts a locator
/// reads it.
///
/// Higher priorities are consulted first, equal priorities in registration
/// order. Only `can_handle` runs during selection.
#[derive(Default)]
pub struct ReaderDispatcher {
    readers: Vec<RegisteredReader>,
}

impl ReaderDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readers(readers: Vec<Arc<dyn DocumentReader>>) -> Self {
        let mut dispatcher = Self::new();
        for reader in readers {
            dispatcher.register(reader, 0);
        }
        dispatcher
    }

    /// Text and markdown readers over `loader`, markdown consulted first.
    pub fn from_config(loader: Arc<dyn ContentLoader>, config: &AppConfig) -> Self {
        Self::new()
            .with_reader(
                Arc::new(MarkdownDocumentReader::with_extensions(
                    Arc::clone(&loader),
                    config.markdown_extensions.clone(),
                )
                .with_encoding(config.text_encoding.clone())),
                10,
            )
            .with_reader(
                Arc::new(TextDocumentReader::with_extensions(
                    loader,
                    config.text_extensions.clone(),
                )
                .with_encoding(config.text_encoding.clone())),
                0,
            )
    }

    pub fn register(&mut self, reader: Arc<dyn DocumentReader>, priority: i32) {
        let position = self
            .readers
            .iter()
            .position(|registered| registered.priority < priority)
            .unwrap_or(self.readers.len());
        debug!(reader = reader.name(), priority, position, "reader registered");
        self.readers
            .insert(position, RegisteredReader { priority, reader });
    }

    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn DocumentReader>, priority: i32) -> Self {
        self.register(reader, priority);
        self
    }

    pub fn select(&self, locator: &str) -> Result<&Arc<dyn DocumentReader>, IngestError> {
        let selected = self
            .readers
            .iter()
            .find(|registered| registered.reader.can_handle(locator))
            .map(|registered| &registered.reader);

        match selected {
            Some(reader) => {
                debug!(locator, reader = reader.name(), "reader selected");
                Ok(reader)
            }
            None => {
                debug!(locator, registered = self.readers.len(), "no reader can handle locator");
                Err(IngestError::NoReaderAvailable(locator.to_string()))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

#[async_trait]
impl DocumentReader for ReaderDispatcher {
    fn name(&self) -> &str {
        "ReaderDispatcher"
    }

    fn can_handle(&self, locator: &str) -> bool {
        self.readers
            .iter()
            .any(|registered| registered.reader.can_handle(locator))
    }

    fn read(&self, locator: &str) -> Result<Document, IngestError> {
        self.select(locator)?.read(locator)
    }

    async fn read_async(&self, locator: &str) -> Result<Document, IngestError> {
        self.select(locator)?.read_async(locator).await
    }
}
