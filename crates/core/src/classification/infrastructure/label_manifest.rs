use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::constants::{LABEL_MANIFEST_SCHEMA_VERSION, LABEL_MANIFEST_SUFFIX};
use crate::shared::emotion::{canonical_fingerprint, label_order_fingerprint, EmotionLabel};
use crate::shared::startup_error::StartupError;

/// What the model's final layer emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Scores already form a probability distribution.
    Softmax,
    /// Raw scores; softmax is applied after inference.
    Logits,
}

/// Sidecar file pinning the label order a model was trained with.
///
/// ```json
/// {"schema_version": 1, "labels": ["angry", ...], "fingerprint": "…", "output": "softmax"}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelManifest {
    pub schema_version: u32,
    pub labels: Vec<String>,
    pub fingerprint: String,
    pub output: OutputKind,
}

impl LabelManifest {
    /// Manifest for the built-in label order.
    pub fn canonical(output: OutputKind) -> Self {
        Self {
            schema_version: LABEL_MANIFEST_SCHEMA_VERSION,
            labels: EmotionLabel::ALL.iter().map(|l| l.as_str().to_string()).collect(),
            fingerprint: canonical_fingerprint(),
            output,
        }
    }

    /// `emotion.onnx` → `emotion.labels.json`.
    pub fn path_for_model(model_path: &Path) -> PathBuf {
        model_path.with_extension(LABEL_MANIFEST_SUFFIX)
    }

    /// Reads and validates a manifest against the built-in label order.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        if !path.exists() {
            return Err(StartupError::ManifestMissing(path.to_path_buf()));
        }
        let invalid = |message: String| StartupError::ManifestInvalid {
            path: path.to_path_buf(),
            message,
        };

        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let manifest: LabelManifest =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;

        if manifest.schema_version != LABEL_MANIFEST_SCHEMA_VERSION {
            return Err(invalid(format!(
                "unsupported schema_version {} (expected {LABEL_MANIFEST_SCHEMA_VERSION})",
                manifest.schema_version
            )));
        }

        let expected = Self::canonical(manifest.output);
        if manifest.labels != expected.labels {
            return Err(StartupError::LabelOrderMismatch {
                path: path.to_path_buf(),
                found: manifest.labels,
                expected: expected.labels,
            });
        }

        let declared = label_order_fingerprint(&manifest.labels);
        if manifest.fingerprint != declared {
            return Err(StartupError::FingerprintMismatch {
                path: path.to_path_buf(),
                found: manifest.fingerprint,
                expected: declared,
            });
        }

        Ok(manifest)
    }

    pub fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")?;
        Ok(())
    }
}
