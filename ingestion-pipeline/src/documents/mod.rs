mod content_loader;
mod dispatcher;
mod locator;
mod markdown_reader;
mod text_reader;

pub use content_loader::{ContentLoader, DefaultContentLoader, DEFAULT_ENCODING};
pub use dispatcher::ReaderDispatcher;
pub use locator::Locator;
pub use markdown_reader::MarkdownDocumentReader;
pub use text_reader::TextDocumentReader;

use async_trait::async_trait;
use common::{error::IngestError, types::Document};

/// Turns a locator into a structured [`Document`].
///
/// `can_handle` must stay cheap and side-effect free: the dispatcher calls it
/// on every registered reader until one accepts.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn can_handle(&self, locator: &str) -> bool;

    fn read(&self, locator: &str) -> Result<Document, IngestError>;

    async fn read_async(&self, locator: &str) -> Result<Document, IngestError> {
        self.read(locator)
    }
}

/// Extension / `data:` media type matching shared by the bundled readers.
fn locator_matches(locator: &str, extensions: &[String], media_types: &[&str]) -> bool {
    match Locator::parse(locator) {
        Ok(parsed) => match parsed.media_type() {
            Some(media_type) => media_types.contains(&media_type),
            None => parsed.extension().is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(&ext))
            }),
        },
        Err(_) => false,
    }
}

fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts(values: &[&str]) -> Vec<String> {
        normalize_extensions(values.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn matches_by_extension_case_insensitively() {
        let extensions = exts(&[".TXT", "text"]);
        assert!(locator_matches("notes/a.txt", &extensions, &[]));
        assert!(locator_matches("notes/A.Text", &extensions, &[]));
        assert!(locator_matches("zip://inner/a.txt::bundle.zip", &extensions, &[]));
        assert!(!locator_matches("notes/a.md", &extensions, &[]));
        assert!(!locator_matches("notes/README", &extensions, &[]));
    }

    #[test]
    fn data_uris_match_by_media_type_only() {
        let extensions = exts(&["txt"]);
        assert!(locator_matches("data:text/plain,hi", &extensions, &["text/plain"]));
        assert!(!locator_matches("data:text/html,<p>hi</p>", &extensions, &["text/plain"]));
    }

    #[test]
    fn unparseable_locators_never_match() {
        assert!(!locator_matches("s3://bucket/a.txt", &exts(&["txt"]), &[]));
        assert!(!locator_matches("", &exts(&["txt"]), &[""]));
    }
}
