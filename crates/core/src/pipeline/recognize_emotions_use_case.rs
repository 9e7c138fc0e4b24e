use std::sync::Arc;
use std::time::Instant;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::classification::domain::region_normalizer::RegionNormalizer;
use crate::detection::domain::face_localizer::FaceLocalizer;
use crate::shared::detection::{Detection, FrameResult};
use crate::video::domain::frame_source::FrameSource;

use super::pipeline_error::PipelineError;
use super::pipeline_logger::PipelineLogger;

/// Per-frame pipeline: acquire → mirror → localize → classify → annotate.
///
/// Owns its frame source exclusively; the classifier is shared. No state is
/// carried from one `process_frame` call to the next.
pub struct RecognizeEmotionsUseCase {
    source: Box<dyn FrameSource>,
    localizer: Box<dyn FaceLocalizer>,
    normalizer: RegionNormalizer,
    classifier: Arc<dyn EmotionClassifier>,
    annotator: Box<dyn FrameAnnotator>,
    logger: Box<dyn PipelineLogger>,
}

impl RecognizeEmotionsUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        localizer: Box<dyn FaceLocalizer>,
        classifier: Arc<dyn EmotionClassifier>,
        annotator: Box<dyn FrameAnnotator>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            localizer,
            normalizer: RegionNormalizer::new(),
            classifier,
            annotator,
            logger,
        }
    }

    /// Processes the next frame from the source.
    ///
    /// An acquisition failure releases the source before it is returned;
    /// no partial result is produced.
    pub fn process_frame(&mut self) -> Result<FrameResult, PipelineError> {
        let t0 = Instant::now();
        let raw = match self.source.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                self.source.release();
                return Err(e.into());
            }
        };
        let frame = raw.mirrored();
        self.logger.timing("acquire", elapsed_ms(t0));

        let t1 = Instant::now();
        let converted;
        let gray = if frame.is_grayscale() {
            &frame
        } else {
            converted = frame.to_grayscale()?;
            &converted
        };
        let regions = self
            .localizer
            .locate(gray)
            .map_err(|e| PipelineError::Localization(e.to_string()))?;
        self.logger.timing("localize", elapsed_ms(t1));
        self.logger.metric("faces", regions.len() as f64);

        let t2 = Instant::now();
        let mut detections = Vec::with_capacity(regions.len());
        for region in regions {
            let input = self.normalizer.normalize(gray, &region)?;
            let (label, confidence) = self.classifier.classify(&input)?.top();
            detections.push(Detection {
                label,
                confidence,
                bbox: region,
            });
        }
        self.logger.timing("classify", elapsed_ms(t2));

        let t3 = Instant::now();
        let annotated = self.annotator.annotate(&frame, &detections);
        self.logger.timing("annotate", elapsed_ms(t3));

        Ok(FrameResult {
            annotated,
            detections,
        })
    }

    /// Releases the frame source. Safe to call more than once.
    pub fn release(&mut self) {
        self.source.release();
    }

    pub fn logger_mut(&mut self) -> &mut dyn PipelineLogger {
        self.logger.as_mut()
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
