use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Draws detections onto a copy of a frame.
///
/// The input frame and detections are never modified. With no detections
/// the returned frame equals the input pixel for pixel.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, frame: &Frame, detections: &[Detection]) -> Frame;
}
