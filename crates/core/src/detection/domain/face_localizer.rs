use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Domain interface for face localization.
///
/// Returns every face rectangle found in `frame`, clamped to the frame
/// bounds. Zero faces is an empty `Vec`, not an error. Implementations may
/// keep scratch buffers between calls, hence `&mut self`.
pub trait FaceLocalizer: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>>;
}
