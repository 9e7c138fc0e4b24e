use thiserror::Error;

use super::region_normalizer::NormalizedInput;
use crate::shared::emotion::{DistributionError, EmotionDistribution};

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("classifier returned a malformed distribution: {0}")]
    MalformedOutput(#[from] DistributionError),
}

/// Maps a normalized face to a distribution over the seven emotion labels.
///
/// Implementations are loaded once and shared read-only between pipelines,
/// hence `&self` and `Send + Sync`.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, input: &NormalizedInput) -> Result<EmotionDistribution, ClassificationError>;
}
