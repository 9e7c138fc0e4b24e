use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::frame_source::AcquisitionError;

use super::pipeline_error::PipelineError;
use super::recognize_emotions_use_case::RecognizeEmotionsUseCase;

/// Why a stream run ended without an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The cancel flag was observed between frames.
    Cancelled,
    /// The configured frame limit was reached.
    FrameLimit,
    /// The source could not produce another frame.
    SourceEnded(AcquisitionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: usize,
    pub faces: usize,
    pub stop_reason: StopReason,
}

/// Continuous loop: process a frame, hand it to the sink, repeat.
///
/// Cancellation is cooperative and checked only between frames. The frame
/// source is released and the sink closed on every exit path. This is a
/// single-use struct.
pub struct StreamEmotionsUseCase {
    pipeline: RecognizeEmotionsUseCase,
    sink: Box<dyn FrameSink>,
    cancelled: Arc<AtomicBool>,
    max_frames: Option<usize>,
}

impl StreamEmotionsUseCase {
    pub fn new(
        pipeline: RecognizeEmotionsUseCase,
        sink: Box<dyn FrameSink>,
        cancelled: Option<Arc<AtomicBool>>,
        max_frames: Option<usize>,
    ) -> Self {
        Self {
            pipeline,
            sink,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
            max_frames,
        }
    }

    pub fn execute(&mut self) -> Result<StreamSummary, PipelineError> {
        let outcome = self.run_loop();

        self.pipeline.release();
        let closed = self.sink.close();
        self.pipeline.logger_mut().summary();

        let summary = outcome?;
        closed.map_err(|e| PipelineError::Sink(e.to_string()))?;
        log::info!(
            "Stream stopped after {} frames ({:?})",
            summary.frames,
            summary.stop_reason
        );
        Ok(summary)
    }

    fn run_loop(&mut self) -> Result<StreamSummary, PipelineError> {
        let mut frames = 0;
        let mut faces = 0;
        let total = self.max_frames.unwrap_or(0);

        let stop_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                break StopReason::FrameLimit;
            }

            let result = match self.pipeline.process_frame() {
                Ok(result) => result,
                Err(PipelineError::Acquisition(e)) => break StopReason::SourceEnded(e),
                Err(e) => return Err(e),
            };

            faces += result.detections.len();
            frames += 1;
            self.sink
                .write(result)
                .map_err(|e| PipelineError::Sink(e.to_string()))?;
            self.pipeline.logger_mut().progress(frames, total);
        };

        Ok(StreamSummary {
            frames,
            faces,
            stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::infrastructure::box_label_annotator::BoxLabelAnnotator;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::recognize_emotions_use_case::tests::{
        gradient_frame, FixedClassifier, StubLocalizer, StubSource,
    };
    use crate::shared::detection::FrameResult;
    use crate::shared::emotion::EmotionLabel;
    use crate::shared::region::FaceRegion;
    use std::sync::Mutex;

    // --- Stubs ---

    #[derive(Default)]
    struct RecordingSink {
        written: Arc<Mutex<Vec<FrameResult>>>,
        closed: Arc<AtomicBool>,
        fail_on_write: bool,
        cancel_after_write: Option<Arc<AtomicBool>>,
    }

    impl FrameSink for RecordingSink {
        fn write(&mut self, result: FrameResult) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_on_write {
                return Err("disk full".into());
            }
            self.written.lock().unwrap().push(result);
            if let Some(flag) = &self.cancel_after_write {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    // --- Helpers ---

    fn pipeline(frame_count: usize) -> (RecognizeEmotionsUseCase, Arc<AtomicBool>) {
        let frames = (0..frame_count).map(|i| gradient_frame(40, 40, i)).collect();
        let source = StubSource::new(frames);
        let released = source.released.clone();
        let uc = RecognizeEmotionsUseCase::new(
            Box::new(source),
            Box::new(StubLocalizer::new(vec![FaceRegion::new(4, 4, 20, 20)])),
            Arc::new(FixedClassifier::peaked(EmotionLabel::Happy, 0.8)),
            Box::new(BoxLabelAnnotator::new()),
            Box::new(NullPipelineLogger),
        );
        (uc, released)
    }

    // --- Tests ---

    #[test]
    fn test_runs_until_source_ends() {
        let (uc, released) = pipeline(3);
        let sink = RecordingSink::default();
        let written = sink.written.clone();
        let closed = sink.closed.clone();

        let summary = StreamEmotionsUseCase::new(uc, Box::new(sink), None, None)
            .execute()
            .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.faces, 3);
        assert_eq!(
            summary.stop_reason,
            StopReason::SourceEnded(AcquisitionError::EndOfStream)
        );
        let indices: Vec<usize> = written
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.annotated.index())
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(released.load(Ordering::SeqCst));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_frame_limit() {
        let (uc, released) = pipeline(10);
        let summary = StreamEmotionsUseCase::new(uc, Box::new(RecordingSink::default()), None, Some(4))
            .execute()
            .unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.stop_reason, StopReason::FrameLimit);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancel_before_start_processes_nothing() {
        let (uc, released) = pipeline(5);
        let cancelled = Arc::new(AtomicBool::new(true));
        let summary = StreamEmotionsUseCase::new(
            uc,
            Box::new(RecordingSink::default()),
            Some(cancelled),
            None,
        )
        .execute()
        .unwrap();
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancel_takes_effect_after_in_flight_frame() {
        let (uc, _) = pipeline(5);
        let cancelled = Arc::new(AtomicBool::new(false));
        let sink = RecordingSink {
            cancel_after_write: Some(cancelled.clone()),
            ..Default::default()
        };
        let written = sink.written.clone();

        let summary = StreamEmotionsUseCase::new(uc, Box::new(sink), Some(cancelled), None)
            .execute()
            .unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(written.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_sink_failure_still_releases_and_closes() {
        let (uc, released) = pipeline(3);
        let sink = RecordingSink {
            fail_on_write: true,
            ..Default::default()
        };
        let closed = sink.closed.clone();

        let err = StreamEmotionsUseCase::new(uc, Box::new(sink), None, None)
            .execute()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Sink(ref m) if m.contains("disk full")));
        assert!(released.load(Ordering::SeqCst));
        assert!(closed.load(Ordering::SeqCst));
    }
}
