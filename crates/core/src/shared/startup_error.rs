use std::path::PathBuf;

use thiserror::Error;

use super::emotion::DistributionError;

/// Conditions that must stop the process before any frame is served.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("model file not found: {0}")]
    ModelMissing(PathBuf),
    #[error("failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },
    #[error("label manifest not found: {0}")]
    ManifestMissing(PathBuf),
    #[error("failed to read label manifest {path}: {message}")]
    ManifestInvalid { path: PathBuf, message: String },
    #[error("label manifest {path} declares labels {found:?}, expected {expected:?}")]
    LabelOrderMismatch {
        path: PathBuf,
        found: Vec<String>,
        expected: Vec<String>,
    },
    #[error("label manifest {path} fingerprint {found} does not match {expected}")]
    FingerprintMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },
    #[error("model {path} does not produce a valid emotion distribution: {source}")]
    InvalidModelOutput {
        path: PathBuf,
        #[source]
        source: DistributionError,
    },
    #[error("cascade file not found: {0}")]
    CascadeMissing(PathBuf),
    #[error("failed to parse cascade {path}: {message}")]
    CascadeParse { path: PathBuf, message: String },
    #[error("failed to open frame source {source_name}: {message}")]
    SourceOpen { source_name: String, message: String },
}
