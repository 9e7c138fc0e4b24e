use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

/// Why a source could not hand out a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("frame source disconnected: {0}")]
    Disconnected(String),
    #[error("frame source already released")]
    Released,
    #[error("frame source reached end of stream")]
    EndOfStream,
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

/// Produces frames from a camera or file, one per call.
///
/// A source is exclusively owned by one pipeline (`&mut self` everywhere).
/// Implementations never retry; the caller decides what a failure means.
pub trait FrameSource: Send {
    /// Reads the next frame, advancing the device by one frame.
    fn acquire(&mut self) -> Result<Frame, AcquisitionError>;

    /// Releases the underlying device. Idempotent; later `acquire` calls
    /// return [`AcquisitionError::Released`].
    fn release(&mut self);
}

/// Where frames come from: a capture device ordinal or a media file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    Device(u32),
    File(PathBuf),
}

impl SourceSpec {
    /// All-digit strings name a device ordinal; anything else is a path.
    pub fn parse(value: &str) -> SourceSpec {
        match value.parse::<u32>() {
            Ok(index) if value.chars().all(|c| c.is_ascii_digit()) => SourceSpec::Device(index),
            _ => SourceSpec::File(PathBuf::from(value)),
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Device(index) => write!(f, "device #{index}"),
            SourceSpec::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", SourceSpec::Device(0))]
    #[case("12", SourceSpec::Device(12))]
    #[case("video.mp4", SourceSpec::File(PathBuf::from("video.mp4")))]
    #[case("+1", SourceSpec::File(PathBuf::from("+1")))]
    #[case("/dev/video0", SourceSpec::File(PathBuf::from("/dev/video0")))]
    fn test_parse(#[case] input: &str, #[case] expected: SourceSpec) {
        assert_eq!(SourceSpec::parse(input), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(SourceSpec::Device(2).to_string(), "device #2");
        assert_eq!(
            SourceSpec::File(PathBuf::from("clip.mp4")).to_string(),
            "clip.mp4"
        );
    }
}
