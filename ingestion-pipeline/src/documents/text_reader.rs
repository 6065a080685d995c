use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::IngestError,
    types::{Document, DocumentNode},
};
use tracing::debug;

use super::{
    locator_matches, normalize_extensions, ContentLoader, DocumentReader, DEFAULT_ENCODING,
};

const TEXT_MEDIA_TYPES: &[&str] = &["", "text/plain"];
const TEXT_NODE_PATH: &str = "1";

/// Plain text reader: the whole file becomes a single node.
pub struct TextDocumentReader {
    loader: Arc<dyn ContentLoader>,
    extensions: Vec<String>,
    encoding: String,
}

impl TextDocumentReader {
    pub fn new(loader: Arc<dyn ContentLoader>) -> Self {
        Self::with_extensions(loader, vec!["txt".into(), "text".into()])
    }

    pub fn with_extensions(loader: Arc<dyn ContentLoader>, extensions: Vec<String>) -> Self {
        Self {
            loader,
            extensions: normalize_extensions(extensions),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }

    /// Overrides the text encoding label, `utf-8` by default.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    fn build_document(locator: &str, text: &str) -> Document {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        debug!(locator, chars = text.chars().count(), "text document read");
        Document::new(locator, vec![DocumentNode::new(TEXT_NODE_PATH, text)])
    }
}

#[async_trait]
impl DocumentReader for TextDocumentReader {
    fn name(&self) -> &str {
        "TextDocumentReader"
    }

    fn can_handle(&self, locator: &str) -> bool {
        locator_matches(locator, &self.extensions, TEXT_MEDIA_TYPES)
    }

    fn read(&self, locator: &str) -> Result<Document, IngestError> {
        let text = self.loader.load_text_with_encoding(locator, &self.encoding)?;
        Ok(Self::build_document(locator, &text))
    }

    async fn read_async(&self, locator: &str) -> Result<Document, IngestError> {
        let text = self
            .loader
            .load_text_with_encoding_async(locator, &self.encoding)
            .await?;
        Ok(Self::build_document(locator, &text))
    }
}
