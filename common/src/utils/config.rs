use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use super::embedding::EmbeddingBackend;
use crate::{error::IngestError, types::DEFAULT_MODALITY};

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategyKind {
    #[default]
    Text,
    Markdown,
    Sentence,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_modality")]
    pub modality: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default)]
    pub chunk_strategy: ChunkStrategyKind,
    #[serde(default = "default_chunk_min_chars")]
    pub chunk_min_chars: usize,
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_sentences_per_chunk")]
    pub sentences_per_chunk: usize,
    #[serde(default = "default_sentence_overlap")]
    pub sentence_overlap: usize,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
    #[serde(default = "default_markdown_extensions")]
    pub markdown_extensions: Vec<String>,
    #[serde(default = "default_text_encoding")]
    pub text_encoding: String,
}

fn default_modality() -> String {
    DEFAULT_MODALITY.to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chunk_min_chars() -> usize {
    500
}

fn default_chunk_max_chars() -> usize {
    2_000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_sentences_per_chunk() -> usize {
    6
}

fn default_sentence_overlap() -> usize {
    2
}

fn default_batch_concurrency() -> usize {
    4
}

fn default_text_extensions() -> Vec<String> {
    vec!["txt".into(), "text".into()]
}

fn default_markdown_extensions() -> Vec<String> {
    vec!["md".into(), "markdown".into()]
}

fn default_text_encoding() -> String {
    "utf-8".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            modality: default_modality(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_dimension: default_embedding_dimension(),
            embedding_model: None,
            openai_api_key: None,
            openai_base_url: default_base_url(),
            chunk_strategy: ChunkStrategyKind::default(),
            chunk_min_chars: default_chunk_min_chars(),
            chunk_max_chars: default_chunk_max_chars(),
            chunk_overlap: default_chunk_overlap(),
            sentences_per_chunk: default_sentences_per_chunk(),
            sentence_overlap: default_sentence_overlap(),
            batch_concurrency: default_batch_concurrency(),
            text_extensions: default_text_extensions(),
            markdown_extensions: default_markdown_extensions(),
            text_encoding: default_text_encoding(),
        }
    }
}

/// Loads `config.{toml,yaml,json}` from the working directory when present,
/// then lets environment variables override individual keys.
pub fn get_config() -> Result<AppConfig, IngestError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    Ok(config.try_deserialize::<AppConfig>()?)
}

pub fn get_config_from(path: &Path) -> Result<AppConfig, IngestError> {
    let config = Config::builder()
        .add_source(File::from(path))
        .build()?;

    Ok(config.try_deserialize::<AppConfig>()?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();

        assert_eq!(config.modality, "text");
        assert_eq!(config.embedding_backend, EmbeddingBackend::Hashed);
        assert_eq!(config.chunk_strategy, ChunkStrategyKind::Text);
        assert_eq!(config.sentences_per_chunk, 6);
        assert_eq!(config.sentence_overlap, 2);
        assert_eq!(config.batch_concurrency, 4);
        assert_eq!(config.text_extensions, vec!["txt", "text"]);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config");
        writeln!(
            file,
            r#"
modality = "markdown"
embedding_backend = "hashed"
embedding_dimension = 16
chunk_strategy = "sentence"
sentences_per_chunk = 4
sentence_overlap = 1
"#
        )
        .expect("write config");

        let config = get_config_from(file.path()).expect("config loads");

        assert_eq!(config.modality, "markdown");
        assert_eq!(config.embedding_dimension, 16);
        assert_eq!(config.chunk_strategy, ChunkStrategyKind::Sentence);
        assert_eq!(config.sentences_per_chunk, 4);
        assert_eq!(config.sentence_overlap, 1);
        assert_eq!(config.chunk_max_chars, 2_000);
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config");
        writeln!(file, r#"embedding_backend = "word2vec""#).expect("write config");

        assert!(matches!(
            get_config_from(file.path()),
            Err(IngestError::Config(_))
        ));
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = get_config_from(&dir.path().join("absent.toml")).expect_err("no file");
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn text_encoding_can_be_configured() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config");
        writeln!(file, r#"text_encoding = "windows-1252""#).expect("write config");

        let config = get_config_from(file.path()).expect("config loads");

        assert_eq!(config.text_encoding, "windows-1252");
        assert_eq!(AppConfig::default().text_encoding, "utf-8");
    }
}
