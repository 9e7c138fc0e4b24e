use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::shared::frame::Frame;

/// Encodes a frame as a baseline JPEG.
///
/// RGB and grayscale frames are supported; other layouts are rejected.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let color = match frame.channels() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        n => return Err(format!("cannot encode {n}-channel frame as JPEG").into()),
    };

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder.encode(frame.data(), frame.width(), frame.height(), color)?;
    Ok(buf)
}
