use thiserror::Error;

use crate::classification::domain::emotion_classifier::ClassificationError;
use crate::shared::frame::FrameError;
use crate::shared::region::RegionError;
use crate::video::domain::frame_source::AcquisitionError;

/// Why a single frame could not be turned into a [`FrameResult`].
///
/// [`FrameResult`]: crate::shared::detection::FrameResult
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("face localization failed: {0}")]
    Localization(String),
    #[error("face region rejected: {0}")]
    Normalization(#[from] RegionError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error("frame sink failed: {0}")]
    Sink(String),
}
