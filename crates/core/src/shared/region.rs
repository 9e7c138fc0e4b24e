use thiserror::Error;

use super::frame::FrameError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("region {region:?} is empty")]
    Empty { region: FaceRegion },
    #[error("region {region:?} exceeds frame bounds {frame_width}x{frame_height}")]
    OutOfBounds {
        region: FaceRegion,
        frame_width: u32,
        frame_height: u32,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// An axis-aligned face rectangle in frame pixel coordinates.
///
/// Coordinates are unsigned, so the rectangle can never start left of or
/// above the frame origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.right() <= frame_width && self.bottom() <= frame_height
    }

    /// Checks that the region is non-empty and fully inside the frame.
    pub fn validate(&self, frame_width: u32, frame_height: u32) -> Result<(), RegionError> {
        if self.is_empty() {
            return Err(RegionError::Empty { region: *self });
        }
        if !self.fits_within(frame_width, frame_height) {
            return Err(RegionError::OutOfBounds {
                region: *self,
                frame_width,
                frame_height,
            });
        }
        Ok(())
    }

    /// Builds a region from signed corner coordinates, cropping whatever
    /// falls outside `[0, frame_width) × [0, frame_height)`.
    ///
    /// Returns `None` when nothing of the rectangle remains.
    pub fn clamped(
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<FaceRegion> {
        let x1 = x.clamp(0, frame_width as i64);
        let y1 = y.clamp(0, frame_height as i64);
        let x2 = (x + width).clamp(0, frame_width as i64);
        let y2 = (y + height).clamp(0, frame_height as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(FaceRegion::new(
            x1 as u32,
            y1 as u32,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
        ))
    }

    /// `[x, y, width, height]`, the wire form used by detection reports.
    pub fn to_bbox(&self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}
