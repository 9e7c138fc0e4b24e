use std::io::Write;

use crate::shared::constants::{DEFAULT_JPEG_QUALITY, MJPEG_BOUNDARY};
use crate::shared::detection::FrameResult;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::infrastructure::jpeg_encoder::encode_jpeg;

/// Writes annotated frames as a `multipart/x-mixed-replace` JPEG stream.
///
/// Each frame becomes one part:
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg>\r\n`.
/// The output is typically stdout piped into an HTTP front end, or a file.
pub struct MjpegStreamWriter<W: Write + Send> {
    out: Option<W>,
    quality: u8,
    parts_written: usize,
}

impl<W: Write + Send> MjpegStreamWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_quality(out, DEFAULT_JPEG_QUALITY)
    }

    pub fn with_quality(out: W, quality: u8) -> Self {
        Self {
            out: Some(out),
            quality,
            parts_written: 0,
        }
    }

    pub fn parts_written(&self) -> usize {
        self.parts_written
    }

    /// Returns the underlying writer, or `None` once the stream is closed.
    pub fn into_inner(mut self) -> Option<W> {
        self.out.take()
    }
}

/// Writes one multipart part holding `jpeg`.
pub fn write_part<W: Write + ?Sized>(out: &mut W, jpeg: &[u8]) -> std::io::Result<()> {
    write!(
        out,
        "--{MJPEG_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n"
    )?;
    out.write_all(jpeg)?;
    out.write_all(b"\r\n")
}

impl<W: Write + Send> FrameSink for MjpegStreamWriter<W> {
    fn write(&mut self, result: FrameResult) -> Result<(), Box<dyn std::error::Error>> {
        let out = self.out.as_mut().ok_or("MJPEG stream already closed")?;
        let jpeg = encode_jpeg(&result.annotated, self.quality)?;
        write_part(out, &jpeg)?;
        out.flush()?;
        self.parts_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        log::debug!("MJPEG stream closed after {} parts", self.parts_written);
        Ok(())
    }
}
