use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::startup_error::StartupError;
use crate::video::domain::frame_source::{AcquisitionError, FrameSource};

/// Serves a still image as a one-frame source.
///
/// The first `acquire` returns the image; every later call reports
/// [`AcquisitionError::EndOfStream`].
pub struct ImageFileSource {
    frame: Option<Frame>,
    released: bool,
}

impl ImageFileSource {
    pub fn open(path: &Path) -> Result<Self, StartupError> {
        let img = image::open(path)
            .map_err(|e| StartupError::SourceOpen {
                source_name: path.display().to_string(),
                message: e.to_string(),
            })?
            .to_rgb8();
        let (width, height) = img.dimensions();
        log::info!("Loaded {} ({width}x{height})", path.display());

        Ok(Self {
            frame: Some(Frame::new(img.into_raw(), width, height, 3, 0)),
            released: false,
        })
    }
}

impl FrameSource for ImageFileSource {
    fn acquire(&mut self) -> Result<Frame, AcquisitionError> {
        if self.released {
            return Err(AcquisitionError::Released);
        }
        self.frame.take().ok_or(AcquisitionError::EndOfStream)
    }

    fn release(&mut self) {
        self.frame = None;
        self.released = true;
    }
}

/// True if `path` has an extension the still-image source can decode.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            crate::shared::constants::IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}
