use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::IngestError,
    types::{Document, DocumentNode},
};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use tracing::debug;

use super::{
    locator_matches, normalize_extensions, ContentLoader, DocumentReader, DEFAULT_ENCODING,
};

const MARKDOWN_MEDIA_TYPES: &[&str] = &["text/markdown", "text/x-markdown"];
const PREAMBLE_NODE_PATH: &str = "0";
const MAX_HEADING_DEPTH: usize = 6;

/// Markdown reader producing one node per heading section.
///
/// Node paths are dotted heading numbers (`1`, `1.1`, `2`); text before the
/// first heading lands in node `0`.
pub struct MarkdownDocumentReader {
    loader: Arc<dyn ContentLoader>,
    extensions: Vec<String>,
    encoding: String,
}

impl MarkdownDocumentReader {
    pub fn new(loader: Arc<dyn ContentLoader>) -> Self {
        Self::with_extensions(loader, vec!["md".into(), "markdown".into()])
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
        let nodes = split_sections(text);
        debug!(locator, nodes = nodes.len(), "markdown document read");
        Document::new(locator, nodes)
    }
}

#[async_trait]
impl DocumentReader for MarkdownDocumentReader {
    fn name(&self) -> &str {
        "MarkdownDocumentReader"
    }

    fn can_handle(&self, locator: &str) -> bool {
        locator_matches(locator, &self.extensions, MARKDOWN_MEDIA_TYPES)
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

struct Section {
    path: String,
    text: String,
}

impl Section {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: String::new(),
        }
    }

    fn end_block(&mut self) {
        let kept = self.text.trim_end().len();
        self.text.truncate(kept);
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
    }

    fn into_node(self) -> Option<DocumentNode> {
        let content = self.text.trim();
        (!content.is_empty()).then(|| DocumentNode::new(self.path, content))
    }
}

fn split_sections(markdown: &str) -> Vec<DocumentNode> {
    let mut nodes = Vec::new();
    let mut counters = [0_usize; MAX_HEADING_DEPTH];
    let mut current = Section::new(PREAMBLE_NODE_PATH);

    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let depth = (level as usize).clamp(1, MAX_HEADING_DEPTH);
                let next = Section::new(heading_path(&mut counters, depth));
                let finished = std::mem::replace(&mut current, next);
                nodes.extend(finished.into_node());
            }
            Event::End(
                TagEnd::Heading(_)
                | TagEnd::Paragraph
                | TagEnd::CodeBlock
                | TagEnd::Item
                | TagEnd::Table
                | TagEnd::TableHead
                | TagEnd::TableRow,
            ) => current.end_block(),
            Event::End(TagEnd::TableCell) => current.text.push(' '),
            Event::Text(text) | Event::Code(text) => current.text.push_str(&text),
            Event::SoftBreak | Event::HardBreak => current.text.push('\n'),
            Event::Rule => current.end_block(),
            _ => {}
        }
    }

    nodes.extend(current.into_node());
    nodes
}

/// Bumps the counter for `depth`, resets the deeper ones and renders the path.
fn heading_path(counters: &mut [usize; MAX_HEADING_DEPTH], depth: usize) -> String {
    for (idx, counter) in counters.iter_mut().enumerate() {
        match (idx.saturating_add(1)).cmp(&depth) {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Equal => *counter = counter.saturating_add(1),
            std::cmp::Ordering::Greater => *counter = 0,
        }
    }

    counters
        .iter()
        .take(depth)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
