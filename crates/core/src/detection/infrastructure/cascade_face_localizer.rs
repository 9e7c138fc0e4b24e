use std::path::Path;

use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::detection::domain::face_localizer::FaceLocalizer;
use crate::shared::constants::{CASCADE_MIN_NEIGHBORS, CASCADE_SCALE_FACTOR};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;
use crate::shared::startup_error::StartupError;

/// Face localizer backed by an OpenCV Haar cascade.
///
/// Runs `detectMultiScale` on the grayscale frame and clamps every
/// rectangle to the frame bounds. Color frames are converted first.
pub struct CascadeFaceLocalizer {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
}

impl CascadeFaceLocalizer {
    /// Loads a cascade XML file (e.g. `haarcascade_frontalface_default.xml`).
    pub fn from_file(path: &Path) -> Result<Self, StartupError> {
        Self::with_params(path, CASCADE_SCALE_FACTOR, CASCADE_MIN_NEIGHBORS)
    }

    pub fn with_params(
        path: &Path,
        scale_factor: f64,
        min_neighbors: usize,
    ) -> Result<Self, StartupError> {
        if !path.exists() {
            return Err(StartupError::CascadeMissing(path.to_path_buf()));
        }
        let parse_error = |message: String| StartupError::CascadeParse {
            path: path.to_path_buf(),
            message,
        };

        let path_str = path
            .to_str()
            .ok_or_else(|| parse_error("path is not valid UTF-8".to_string()))?;
        let classifier = CascadeClassifier::new(path_str).map_err(|e| {
            log::error!("Failed to load Haar cascade: {e}");
            parse_error(e.to_string())
        })?;
        if classifier.empty().map_err(|e| parse_error(e.to_string()))? {
            return Err(parse_error("cascade classifier is empty".to_string()));
        }

        log::info!(
            "Loaded cascade {} (scale {scale_factor}, min neighbors {min_neighbors})",
            path.display()
        );
        Ok(Self {
            classifier,
            scale_factor: scale_factor.max(1.0001),
            min_neighbors: min_neighbors as i32,
        })
    }
}

impl FaceLocalizer for CascadeFaceLocalizer {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>> {
        let converted;
        let gray = if frame.is_grayscale() {
            frame
        } else {
            converted = frame.to_grayscale()?;
            &converted
        };
        let (width, height) = (gray.width(), gray.height());
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::from_slice(gray.data())?;
        let mat = mat.reshape(1, height as i32)?;

        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &mat,
            &mut faces,
            self.scale_factor,
            self.min_neighbors,
            0,
            Size::new(0, 0),
            Size::new(0, 0),
        )?;
        log::debug!("Frame {}: {} faces", frame.index(), faces.len());

        Ok(faces
            .iter()
            .filter_map(|r| {
                FaceRegion::clamped(
                    r.x as i64,
                    r.y as i64,
                    r.width as i64,
                    r.height as i64,
                    width,
                    height,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// One stage, one stump: fires when the top half of an 8x8 window is
    /// brighter than the bottom half.
    const BRIGHT_TOP_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>8</height>
  <width>8</width>
  <stageParams>
    <maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 8 8 -1.</_>
        <_>
          0 0 8 4 2.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    fn write_cascade(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.xml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn localizer(min_neighbors: usize) -> (TempDir, CascadeFaceLocalizer) {
        let (dir, path) = write_cascade(BRIGHT_TOP_CASCADE);
        let loc = CascadeFaceLocalizer::with_params(&path, 1.3, min_neighbors).unwrap();
        (dir, loc)
    }

    /// Black `size`x`size` image with a bright 8x4 bar at (`bar_x`, 8).
    fn bar_frame(size: u32, bar_x: u32) -> Frame {
        let mut pixels = vec![0u8; (size * size) as usize];
        for y in 8..12 {
            for x in bar_x..bar_x + 8 {
                pixels[(y * size + x) as usize] = 255;
            }
        }
        Frame::new(pixels, size, size, 1, 0)
    }

    #[test]
    fn test_missing_cascade() {
        let err = CascadeFaceLocalizer::from_file(Path::new("/nonexistent/cascade.xml"))
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::CascadeMissing(_)));
    }

    #[test]
    fn test_unparseable_cascade() {
        let (_dir, path) = write_cascade("<opencv_storage></opencv_storage>");
        let err = CascadeFaceLocalizer::from_file(&path).err().unwrap();
        assert!(matches!(err, StartupError::CascadeParse { .. }));
    }

    #[test]
    fn test_raw_hits_include_bar_window() {
        let (_dir, mut loc) = localizer(0);
        let faces = loc.locate(&bar_frame(32, 8)).unwrap();
        assert!(faces.contains(&FaceRegion::new(8, 8, 8, 8)));
        assert!(faces.iter().all(|f| f.fits_within(32, 32)));
    }

    #[test]
    fn test_window_touching_right_edge_is_scanned() {
        let (_dir, mut loc) = localizer(0);
        let faces = loc.locate(&bar_frame(32, 24)).unwrap();
        assert!(faces.contains(&FaceRegion::new(24, 8, 8, 8)));
    }

    #[test]
    fn test_frame_equal_to_window_is_scanned() {
        let mut pixels = vec![0u8; 64];
        pixels[..32].fill(255);
        let (_dir, mut loc) = localizer(0);
        let faces = loc.locate(&Frame::new(pixels, 8, 8, 1, 0)).unwrap();
        assert_eq!(faces, vec![FaceRegion::new(0, 0, 8, 8)]);
    }

    #[test]
    fn test_rgb_frame_is_converted() {
        let gray = bar_frame(32, 8);
        let rgb: Vec<u8> = gray.data().iter().flat_map(|&v| [v, v, v]).collect();
        let (_dir, mut loc) = localizer(0);
        let faces = loc.locate(&Frame::new(rgb, 32, 32, 3, 0)).unwrap();
        assert!(faces.contains(&FaceRegion::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_uniform_frame_has_no_faces() {
        let (_dir, mut loc) = localizer(0);
        let faces = loc.locate(&Frame::new(vec![90; 32 * 32], 32, 32, 1, 0)).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_frame_smaller_than_window() {
        let (_dir, mut loc) = localizer(0);
        let faces = loc.locate(&Frame::new(vec![255; 6 * 6], 6, 6, 1, 0)).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_min_neighbors_filters_weak_clusters() {
        let frame = bar_frame(32, 8);
        let (_dir, mut raw) = localizer(0);
        let (_dir2, mut strict) = localizer(50);
        assert!(!raw.locate(&frame).unwrap().is_empty());
        assert!(strict.locate(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_deterministic() {
        let frame = bar_frame(32, 8);
        let (_dir, mut loc) = localizer(1);
        let a = loc.locate(&frame).unwrap();
        let b = loc.locate(&frame).unwrap();
        assert_eq!(a, b);
    }
}
