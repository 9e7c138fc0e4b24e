use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::constants::DISTRIBUTION_TOLERANCE;

/// The seven emotion categories, in classifier output-index order.
///
/// Reordering these variants breaks every trained model; the label manifest
/// fingerprint exists to catch exactly that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

pub const LABEL_COUNT: usize = 7;

impl EmotionLabel {
    pub const ALL: [EmotionLabel; LABEL_COUNT] = [
        EmotionLabel::Angry,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<EmotionLabel> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 hex digest of the given label names joined by `\n`.
pub fn label_order_fingerprint<S: AsRef<str>>(labels: &[S]) -> String {
    let joined = labels
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    format!("{:x}", Sha256::digest(joined.as_bytes()))
}

/// Fingerprint of the built-in label order.
pub fn canonical_fingerprint() -> String {
    let names: Vec<&str> = EmotionLabel::ALL.iter().map(|l| l.as_str()).collect();
    label_order_fingerprint(&names)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("expected 7 scores, got {0}")]
    WrongLength(usize),
    #[error("score {value} at index {index} is out of range")]
    InvalidScore { index: usize, value: f32 },
    #[error("scores sum to {0}, expected 1")]
    NotNormalized(f32),
}

/// A validated probability distribution over [`EmotionLabel::ALL`].
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionDistribution {
    scores: [f32; LABEL_COUNT],
}

impl EmotionDistribution {
    /// Accepts classifier scores that already form a distribution.
    ///
    /// Every score must lie in `[0, 1]`; the sum may drift from 1 by at most
    /// [`DISTRIBUTION_TOLERANCE`].
    pub fn from_probabilities(scores: &[f32]) -> Result<Self, DistributionError> {
        if scores.len() != LABEL_COUNT {
            return Err(DistributionError::WrongLength(scores.len()));
        }
        let mut out = [0.0f32; LABEL_COUNT];
        for (i, &value) in scores.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(DistributionError::InvalidScore { index: i, value });
            }
            out[i] = value;
        }
        let sum: f32 = out.iter().sum();
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(DistributionError::NotNormalized(sum));
        }
        Ok(Self { scores: out })
    }

    /// Applies a numerically stable softmax to raw logits.
    pub fn from_logits(logits: &[f32]) -> Result<Self, DistributionError> {
        if logits.len() != LABEL_COUNT {
            return Err(DistributionError::WrongLength(logits.len()));
        }
        if let Some((index, &value)) = logits.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DistributionError::InvalidScore { index, value });
        }
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        let probs: Vec<f32> = exps.iter().map(|&e| e / sum).collect();
        Self::from_probabilities(&probs)
    }

    pub fn scores(&self) -> &[f32; LABEL_COUNT] {
        &self.scores
    }

    pub fn score(&self, label: EmotionLabel) -> f32 {
        self.scores[label.index()]
    }

    /// Highest-scoring label and its score. Ties resolve to the lowest index.
    pub fn top(&self) -> (EmotionLabel, f32) {
        let mut best = 0;
        for i in 1..LABEL_COUNT {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        (EmotionLabel::ALL[best], self.scores[best])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_label_order_matches_indices() {
        for (i, label) in EmotionLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(EmotionLabel::from_index(i), Some(*label));
        }
        assert_eq!(EmotionLabel::from_index(7), None);
    }

    #[test]
    fn test_label_names() {
        let names: Vec<_> = EmotionLabel::ALL.iter().map(|l| l.to_string()).collect();
        assert_eq!(
            names,
            ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"]
        );
    }

    #[test]
    fn test_label_serializes_lowercase() {
        let json = serde_json::to_string(&EmotionLabel::Surprise).unwrap();
        assert_eq!(json, "\"surprise\"");
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = label_order_fingerprint(&["angry", "disgust"]);
        let b = label_order_fingerprint(&["disgust", "angry"]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_canonical_fingerprint_is_stable() {
        assert_eq!(canonical_fingerprint(), canonical_fingerprint());
        let names = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];
        assert_eq!(canonical_fingerprint(), label_order_fingerprint(&names));
    }

    #[test]
    fn test_top_picks_maximum() {
        let d = EmotionDistribution::from_probabilities(&[0.05, 0.05, 0.1, 0.6, 0.1, 0.05, 0.05])
            .unwrap();
        let (label, conf) = d.top();
        assert_eq!(label, EmotionLabel::Happy);
        assert_relative_eq!(conf, 0.6);
    }

    #[test]
    fn test_top_tie_resolves_to_lowest_index() {
        let d = EmotionDistribution::from_probabilities(&[0.1, 0.1, 0.3, 0.1, 0.3, 0.05, 0.05])
            .unwrap();
        let (label, conf) = d.top();
        assert_eq!(label, EmotionLabel::Fear);
        assert_eq!(label.index(), 2);
        assert_relative_eq!(conf, 0.3);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            EmotionDistribution::from_probabilities(&[0.5, 0.5]),
            Err(DistributionError::WrongLength(2))
        );
    }

    #[test]
    fn test_nan_rejected() {
        let err = EmotionDistribution::from_probabilities(&[f32::NAN, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, DistributionError::InvalidScore { index: 0, .. }));
    }

    #[test]
    fn test_negative_rejected() {
        let err = EmotionDistribution::from_probabilities(&[-0.1, 0.1, 0.0, 1.0, 0.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, DistributionError::InvalidScore { index: 0, .. }));
    }

    #[test]
    fn test_score_above_one_rejected() {
        let err = EmotionDistribution::from_probabilities(&[1.00009, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, DistributionError::InvalidScore { index: 0, .. }));
    }

    #[test]
    fn test_sum_drift_within_tolerance_accepted() {
        let d = EmotionDistribution::from_probabilities(&[0.99995, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        let (label, conf) = d.top();
        assert_eq!(label, EmotionLabel::Angry);
        assert!(conf <= 1.0);
    }

    #[rstest]
    #[case(&[1000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])]
    #[case(&[0.0; 7])]
    #[case(&[-3.0, 7.5, 2.0, 7.5, 0.1, -9.0, 4.0])]
    fn test_from_logits_confidence_never_exceeds_one(#[case] logits: &[f32]) {
        let d = EmotionDistribution::from_logits(logits).unwrap();
        assert!(d.scores().iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(d.top().1 <= 1.0);
    }

    #[test]
    fn test_unnormalized_rejected() {
        let err = EmotionDistribution::from_probabilities(&[0.0; 7]).unwrap_err();
        assert!(matches!(err, DistributionError::NotNormalized(_)));
    }

    #[test]
    fn test_from_logits_sums_to_one() {
        let d = EmotionDistribution::from_logits(&[1.0, 2.0, 0.5, 4.0, -1.0, 0.0, 3.0]).unwrap();
        let sum: f32 = d.scores().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(d.top().0, EmotionLabel::Happy);
    }

    #[test]
    fn test_from_logits_handles_large_values() {
        let d = EmotionDistribution::from_logits(&[1000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(d.score(EmotionLabel::Angry), 1.0, epsilon = 1e-6);
    }
}
