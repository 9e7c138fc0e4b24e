use ndarray::ArrayView3;
use thiserror::Error;

/// Fixed-point luminance weights (14-bit shift) for R, G and B.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("cannot convert a {0}-channel frame to grayscale")]
    UnsupportedChannels(u8),
}

/// A single camera frame: contiguous pixel bytes in row-major order.
///
/// Color frames are RGB (3 channels); grayscale frames have 1 channel.
/// Format conversion happens at I/O boundaries only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Position of the frame in its source's acquisition order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_grayscale(&self) -> bool {
        self.channels == 1
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Returns a copy mirrored along the vertical axis (left ↔ right).
    pub fn mirrored(&self) -> Frame {
        let row_len = self.width as usize * self.channels as usize;
        let c = self.channels as usize;
        let mut out = Vec::with_capacity(self.data.len());
        for row in self.data.chunks_exact(row_len.max(1)).take(self.height as usize) {
            for pixel in row.chunks_exact(c.max(1)).rev() {
                out.extend_from_slice(pixel);
            }
        }
        Frame::new(out, self.width, self.height, self.channels, self.index)
    }

    /// Converts to a single-channel luminance frame.
    ///
    /// Grayscale frames are returned as a plain copy; callers that only need
    /// to read should borrow when [`Frame::is_grayscale`] holds. Frames with
    /// four channels are treated as RGBA and the alpha byte is ignored.
    pub fn to_grayscale(&self) -> Result<Frame, FrameError> {
        match self.channels {
            1 => return Ok(self.clone()),
            3 | 4 => {}
            n => return Err(FrameError::UnsupportedChannels(n)),
        }
        let c = self.channels as usize;
        let gray = self
            .data
            .chunks_exact(c)
            .map(|px| luminance(px[0], px[1], px[2]))
            .collect();
        Ok(Frame::new(gray, self.width, self.height, 1, self.index))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

/// Standard luminance of an RGB triple, rounded to the nearest integer.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B + (1 << (LUMA_SHIFT - 1));
    (y >> LUMA_SHIFT).min(255) as u8
}
