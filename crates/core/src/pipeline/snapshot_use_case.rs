use crate::shared::detection::{FrameResult, SnapshotReport};

use super::pipeline_error::PipelineError;
use super::recognize_emotions_use_case::RecognizeEmotionsUseCase;

/// Outcome of a single-shot query.
#[derive(Debug)]
pub struct Snapshot {
    pub report: SnapshotReport,
    /// The processed frame, absent when nothing could be captured.
    pub result: Option<FrameResult>,
}

/// Processes exactly one frame and reports its detections.
///
/// A capture failure becomes an error report rather than an error; the
/// source is released either way.
pub struct SnapshotUseCase {
    pipeline: RecognizeEmotionsUseCase,
}

impl SnapshotUseCase {
    pub fn new(pipeline: RecognizeEmotionsUseCase) -> Self {
        Self { pipeline }
    }

    pub fn execute(&mut self) -> Result<Snapshot, PipelineError> {
        let outcome = self.pipeline.process_frame();
        self.pipeline.release();

        match outcome {
            Ok(result) => Ok(Snapshot {
                report: SnapshotReport::Emotions {
                    emotions: result.records(),
                },
                result: Some(result),
            }),
            Err(PipelineError::Acquisition(e)) => {
                log::warn!("Snapshot capture failed: {e}");
                Ok(Snapshot {
                    report: SnapshotReport::capture_failed(),
                    result: None,
                })
            }
            Err(e) => Err(e),
        }
    }
}
