use std::{
    collections::hash_map::DefaultHasher,
    future::Future,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context};
use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use fastembed::{
    EmbeddingModel as FastEmbedModelName, ModelTrait, TextEmbedding, TextInitOptions,
};
use serde::Deserialize;
use tracing::debug;

use super::config::AppConfig;
use crate::error::IngestError;

const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Turns batches of text into vectors of a fixed dimension.
///
/// Output order matches input order, one vector per input string. The
/// async variant defaults to the blocking one; backends that wait on the
/// network or a thread pool override it.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;

    async fn embed_async(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        self.embed(batch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAI,
    FastEmbed,
    #[default]
    Hashed,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "hashed" => Ok(Self::Hashed),
            "fastembed" | "fast-embed" | "fast" => Ok(Self::FastEmbed),
            other => Err(anyhow!(
                "unknown embedding backend '{other}'. Expected 'openai', 'hashed', or 'fastembed'."
            )),
        }
    }
}

#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    OpenAI {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    Hashed {
        dimension: usize,
    },
    FastEmbed {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: FastEmbedModelName,
        dimension: usize,
    },
}

impl EmbeddingProvider {
    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Hashed { .. } => "hashed",
            EmbeddingInner::FastEmbed { .. } => "fastembed",
            EmbeddingInner::OpenAI { .. } => "openai",
        }
    }

    pub fn model_code(&self) -> Option<String> {
        match &self.inner {
            EmbeddingInner::FastEmbed { model_name, .. } => Some(model_name.to_string()),
            EmbeddingInner::OpenAI { model, .. } => Some(model.clone()),
            EmbeddingInner::Hashed { .. } => None,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, IngestError> {
        // FastEmbed dimensions come from the model, not the config.
        if config.embedding_dimension == 0
            && config.embedding_backend != EmbeddingBackend::FastEmbed
        {
            return Err(IngestError::Validation(format!(
                "embedding_dimension must be positive for the {:?} embedding backend",
                config.embedding_backend
            )));
        }

        let provider = match config.embedding_backend {
            EmbeddingBackend::Hashed => Self::new_hashed(config.embedding_dimension),
            EmbeddingBackend::FastEmbed => {
                Self::new_fastembed(config.embedding_model.clone()).await?
            }
            EmbeddingBackend::OpenAI => {
                let api_key = config.openai_api_key.as_deref().ok_or_else(|| {
                    IngestError::Validation(
                        "openai_api_key is required for the openai embedding backend".into(),
                    )
                })?;
                let dimensions = u32::try_from(config.embedding_dimension).map_err(|_| {
                    IngestError::Validation(format!(
                        "embedding_dimension {} does not fit the OpenAI request",
                        config.embedding_dimension
                    ))
                })?;
                let client = Client::with_config(
                    OpenAIConfig::new()
                        .with_api_key(api_key)
                        .with_api_base(&config.openai_base_url),
                );
                let model = config
                    .embedding_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
                Self::new_openai(Arc::new(client), model, dimensions)
            }
        };

        debug!(
            backend = provider.backend_label(),
            dimension = provider.dimension(),
            "embedding provider ready"
        );
        Ok(provider)
    }

    pub fn new_openai(client: Arc<Client<OpenAIConfig>>, model: String, dimensions: u32) -> Self {
        EmbeddingProvider {
            inner: EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            },
        }
    }

    pub async fn new_fastembed(model_override: Option<String>) -> Result<Self, IngestError> {
        let model_name = if let Some(code) = model_override {
            FastEmbedModelName::from_str(&code)
                .map_err(|err| IngestError::Validation(err.to_string()))?
        } else {
            FastEmbedModelName::default()
        };

        let options = TextInitOptions::new(model_name.clone()).with_show_download_progress(true);
        let model_name_for_task = model_name.clone();
        let model_name_code = model_name.to_string();

        let (model, dimension) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let model =
                TextEmbedding::try_new(options).context("initialising FastEmbed text model")?;
            let info = FastEmbedModelName::get_model_info(&model_name_for_task)
                .ok_or_else(|| anyhow!("FastEmbed model metadata missing for {model_name_code}"))?;
            Ok((model, info.dim))
        })
        .await?
        .map_err(|err| IngestError::Embedding(format!("{err:#}")))?;

        Ok(EmbeddingProvider {
            inner: EmbeddingInner::FastEmbed {
                model: Arc::new(Mutex::new(model)),
                model_name,
                dimension,
            },
        })
    }

    pub fn new_hashed(dimension: usize) -> Self {
        EmbeddingProvider {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }
}

#[async_trait]
impl EmbeddingModel for EmbeddingProvider {
    fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } | EmbeddingInner::FastEmbed { dimension, .. } => {
                *dimension
            }
            EmbeddingInner::OpenAI { dimensions, .. } => *dimensions as usize,
        }
    }

    fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(batch
                .iter()
                .map(|text| hashed_embedding(text, *dimension))
                .collect()),
            EmbeddingInner::FastEmbed { model, .. } => fastembed_batch(model, batch.to_vec()),
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => block_on(openai_batch(client, model, *dimensions, batch.to_vec()))?,
        }
    }

    async fn embed_async(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        match &self.inner {
            EmbeddingInner::Hashed { .. } => self.embed(batch),
            EmbeddingInner::FastEmbed { model, .. } => {
                let model = Arc::clone(model);
                let texts = batch.to_vec();
                tokio::task::spawn_blocking(move || fastembed_batch(&model, texts)).await?
            }
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => openai_batch(client, model, *dimensions, batch.to_vec()).await,
        }
    }
}

fn fastembed_batch(
    model: &Mutex<TextEmbedding>,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, IngestError> {
    let mut guard = model
        .lock()
        .map_err(|_| IngestError::Embedding("fastembed model lock poisoned".into()))?;
    guard
        .embed(texts, None)
        .map_err(|err| IngestError::Embedding(format!("generating fastembed embeddings: {err}")))
}

async fn openai_batch(
    client: &Client<OpenAIConfig>,
    model: &str,
    dimensions: u32,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, IngestError> {
    let request = CreateEmbeddingRequestArgs::default()
        .model(model)
        .input(texts)
        .dimensions(dimensions)
        .build()
        .map_err(|err| IngestError::Embedding(err.to_string()))?;

    let response = client
        .embeddings()
        .create(request)
        .await
        .map_err(|err| IngestError::Embedding(err.to_string()))?;

    let mut data = response.data;
    data.sort_by_key(|item| item.index);

    Ok(data.into_iter().map(|item| item.embedding).collect())
}

/// Drives a future to completion from synchronous code. Inside a
/// multi-threaded runtime the current worker is handed over to blocking work;
/// outside any runtime a private current-thread runtime is used.
fn block_on<F: Future>(future: F) -> Result<F::Output, IngestError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::CurrentThread => {
            Err(IngestError::Embedding(
                "blocking embed called on a current-thread runtime; use embed_async".into(),
            ))
        }
        Ok(handle) => Ok(tokio::task::block_in_place(|| handle.block_on(future))),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok(runtime.block_on(future))
        }
    }
}

// Helper functions for hashed embeddings
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];
    if text.is_empty() {
        return vector;
    }

    let mut token_count = 0f32;
    for token in tokens(text) {
        token_count += 1.0;
        let idx = bucket(&token, dim);
        if let Some(slot) = vector.get_mut(idx) {
            *slot += 1.0;
        }
    }

    if token_count == 0.0 {
        return vector;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}
