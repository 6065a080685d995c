use common::{types::DEFAULT_MODALITY, utils::config::AppConfig};

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    pub batch_concurrency: usize,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            batch_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub modality: String,
    pub tuning: IngestionTuning,
}

impl IngestionConfig {
    #[must_use]
    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = modality.into();
        self
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            modality: DEFAULT_MODALITY.to_string(),
            tuning: IngestionTuning::default(),
        }
    }
}

impl From<&AppConfig> for IngestionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            modality: config.modality.clone(),
            tuning: IngestionTuning {
                batch_concurrency: config.batch_concurrency.max(1),
            },
        }
    }
}
