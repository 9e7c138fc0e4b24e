use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;

use crate::shared::constants::CLASSIFIER_INPUT_SIZE;
use crate::shared::frame::Frame;
use crate::shared::region::{FaceRegion, RegionError};

/// Classifier input: one 48x48 grayscale face, values in `[0, 1]`,
/// laid out as `(batch=1, height, width, channels=1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedInput {
    tensor: Array4<f32>,
}

impl NormalizedInput {
    /// An all-black input, used to probe a freshly loaded model.
    pub fn zeros() -> Self {
        let s = CLASSIFIER_INPUT_SIZE as usize;
        Self {
            tensor: Array4::zeros((1, s, s, 1)),
        }
    }

    pub fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }

    pub fn shape(&self) -> &[usize] {
        self.tensor.shape()
    }
}

/// Crops a face region and rescales it to the classifier's fixed input.
///
/// The crop is stretched to 48x48 regardless of aspect ratio.
pub struct RegionNormalizer;

impl RegionNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, frame: &Frame, region: &FaceRegion) -> Result<NormalizedInput, RegionError> {
        region.validate(frame.width(), frame.height())?;

        let converted;
        let gray = if frame.is_grayscale() {
            frame
        } else {
            converted = frame.to_grayscale()?;
            &converted
        };
        let fw = gray.width() as usize;
        let crop: Vec<u8> = gray
            .data()
            .chunks_exact(fw)
            .skip(region.y as usize)
            .take(region.height as usize)
            .flat_map(|row| &row[region.x as usize..region.right() as usize])
            .copied()
            .collect();

        let size = CLASSIFIER_INPUT_SIZE;
        let face = GrayImage::from_raw(region.width, region.height, crop)
            .ok_or(RegionError::Empty { region: *region })?;
        let resized = if (region.width, region.height) == (size, size) {
            face
        } else {
            image::imageops::resize(&face, size, size, FilterType::Triangle)
        };

        let s = size as usize;
        let tensor = Array4::from_shape_fn((1, s, s, 1), |(_, y, x, _)| {
            resized.get_pixel(x as u32, y as u32).0[0] as f32 / 255.0
        });
        Ok(NormalizedInput { tensor })
    }
}

impl Default for RegionNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
