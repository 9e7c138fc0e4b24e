use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use super::label_manifest::{LabelManifest, OutputKind};
use crate::classification::domain::emotion_classifier::{ClassificationError, EmotionClassifier};
use crate::classification::domain::region_normalizer::NormalizedInput;
use crate::shared::emotion::EmotionDistribution;
use crate::shared::startup_error::StartupError;

/// Tensor layout the model declares for its single input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputLayout {
    /// `(1, 48, 48, 1)`, the Keras export layout.
    Nhwc,
    /// `(1, 1, 48, 48)`.
    Nchw,
}

impl InputLayout {
    /// Picks NCHW only when the declared shape is 4-D with one channel in
    /// position 1 and a non-unit last axis. Dynamic or unreadable shapes
    /// default to NHWC.
    pub fn from_shape(shape: &[i64]) -> Self {
        if shape.len() == 4 && shape[1] == 1 && shape[3] != 1 {
            InputLayout::Nchw
        } else {
            InputLayout::Nhwc
        }
    }

    fn arrange(self, input: &NormalizedInput) -> Array4<f32> {
        match self {
            InputLayout::Nhwc => input.tensor().clone(),
            InputLayout::Nchw => input
                .tensor()
                .view()
                .permuted_axes([0, 3, 1, 2])
                .as_standard_layout()
                .into_owned(),
        }
    }
}

/// Where classifier inference runs.
///
/// The model takes a single 48x48 face, so host-device transfers can cost
/// more than the inference itself; `Cpu` skips accelerators entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionTarget {
    Cpu,
    /// CoreML on macOS, DirectML on Windows, CPU elsewhere.
    #[default]
    Platform,
}

impl ExecutionTarget {
    fn providers(self) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
        if self == ExecutionTarget::Cpu {
            return Vec::new();
        }
        #[cfg(target_os = "macos")]
        {
            vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
        }
        #[cfg(target_os = "windows")]
        {
            vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            Vec::new()
        }
    }
}

/// Emotion classifier backed by an ONNX Runtime session.
///
/// `Session::run` takes `&mut self`, so concurrent callers are serialized
/// through a mutex. The model is probed once at load with an all-black face
/// and must return a valid seven-way distribution.
pub struct OnnxEmotionClassifier {
    session: Mutex<ort::session::Session>,
    layout: InputLayout,
    output: OutputKind,
}

impl OnnxEmotionClassifier {
    pub fn load(model_path: &Path, manifest_path: &Path) -> Result<Self, StartupError> {
        Self::load_on(model_path, manifest_path, ExecutionTarget::default())
    }

    pub fn load_on(
        model_path: &Path,
        manifest_path: &Path,
        target: ExecutionTarget,
    ) -> Result<Self, StartupError> {
        if !model_path.exists() {
            return Err(StartupError::ModelMissing(model_path.to_path_buf()));
        }
        let manifest = LabelManifest::load(manifest_path)?;

        let session = build_session(model_path, target).map_err(|e| StartupError::ModelLoad {
            path: model_path.to_path_buf(),
            message: e.to_string(),
        })?;
        let layout = declared_layout(&session);

        let classifier = Self {
            session: Mutex::new(session),
            layout,
            output: manifest.output,
        };

        classifier
            .classify(&NormalizedInput::zeros())
            .map_err(|e| match e {
                ClassificationError::MalformedOutput(source) => StartupError::InvalidModelOutput {
                    path: model_path.to_path_buf(),
                    source,
                },
                ClassificationError::Inference(message) => StartupError::ModelLoad {
                    path: model_path.to_path_buf(),
                    message,
                },
            })?;

        log::info!(
            "Loaded emotion model {} ({:?} input, {:?} output, {:?} target)",
            model_path.display(),
            layout,
            manifest.output,
            target
        );
        Ok(classifier)
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, input: &NormalizedInput) -> Result<EmotionDistribution, ClassificationError> {
        let inference = |e: ort::Error| ClassificationError::Inference(e.to_string());

        let value = ort::value::Tensor::from_array(self.layout.arrange(input)).map_err(inference)?;
        let scores: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| ClassificationError::Inference(format!("Lock poisoned: {e}")))?;
            let outputs = session.run(ort::inputs![value]).map_err(inference)?;
            if outputs.len() == 0 {
                return Err(ClassificationError::Inference(
                    "model produced no outputs".to_string(),
                ));
            }
            let tensor = outputs[0].try_extract_array::<f32>().map_err(inference)?;
            tensor.iter().copied().collect()
        };

        let distribution = match self.output {
            OutputKind::Softmax => EmotionDistribution::from_probabilities(&scores)?,
            OutputKind::Logits => EmotionDistribution::from_logits(&scores)?,
        };
        Ok(distribution)
    }
}

fn build_session(
    model_path: &Path,
    target: ExecutionTarget,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(1)?
        .with_execution_providers(target.providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

fn declared_layout(session: &ort::session::Session) -> InputLayout {
    session
        .inputs()
        .first()
        .and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                Some(InputLayout::from_shape(shape))
            } else {
                None
            }
        })
        .unwrap_or(InputLayout::Nhwc)
}
