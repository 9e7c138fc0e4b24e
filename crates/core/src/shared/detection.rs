use serde::{Deserialize, Serialize};

use super::constants::CAPTURE_FAILED_MESSAGE;
use super::emotion::EmotionLabel;
use super::frame::Frame;
use super::region::FaceRegion;

/// One classified face in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: EmotionLabel,
    pub confidence: f32,
    pub bbox: FaceRegion,
}

impl Detection {
    /// Text drawn above the face box, e.g. `happy (93.1%)`.
    pub fn caption(&self) -> String {
        format!("{} ({:.1}%)", self.label, self.confidence * 100.0)
    }

    pub fn to_record(&self) -> DetectionRecord {
        DetectionRecord {
            emotion: self.label.as_str().to_string(),
            confidence: self.confidence as f64,
            bbox: self.bbox.to_bbox(),
        }
    }
}

/// Output of one pipeline invocation. Owns its frame outright.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub annotated: Frame,
    pub detections: Vec<Detection>,
}

impl FrameResult {
    pub fn records(&self) -> Vec<DetectionRecord> {
        self.detections.iter().map(Detection::to_record).collect()
    }
}

/// Serialized form of a [`Detection`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub emotion: String,
    pub confidence: f64,
    pub bbox: [u32; 4],
}

/// Answer to a single-shot query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotReport {
    Emotions { emotions: Vec<DetectionRecord> },
    Error { error: String },
}

impl SnapshotReport {
    pub fn capture_failed() -> Self {
        SnapshotReport::Error {
            error: CAPTURE_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: EmotionLabel, confidence: f32) -> Detection {
        Detection {
            label,
            confidence,
            bbox: FaceRegion::new(10, 20, 30, 40),
        }
    }

    #[test]
    fn test_caption_format() {
        assert_eq!(detection(EmotionLabel::Happy, 0.9312).caption(), "happy (93.1%)");
        assert_eq!(detection(EmotionLabel::Sad, 1.0).caption(), "sad (100.0%)");
        assert_eq!(detection(EmotionLabel::Fear, 0.0).caption(), "fear (0.0%)");
    }

    #[test]
    fn test_record_fields() {
        let record = detection(EmotionLabel::Neutral, 0.5).to_record();
        assert_eq!(record.emotion, "neutral");
        assert_eq!(record.confidence, 0.5);
        assert_eq!(record.bbox, [10, 20, 30, 40]);
    }

    #[test]
    fn test_snapshot_emotions_json_shape() {
        let report = SnapshotReport::Emotions {
            emotions: vec![detection(EmotionLabel::Angry, 0.5).to_record()],
        };
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["emotions"][0]["emotion"], "angry");
        assert_eq!(value["emotions"][0]["confidence"], 0.5);
        assert_eq!(value["emotions"][0]["bbox"], serde_json::json!([10, 20, 30, 40]));
    }

    #[test]
    fn test_snapshot_empty_emotions() {
        let report = SnapshotReport::Emotions { emotions: vec![] };
        assert_eq!(report.to_json().unwrap(), r#"{"emotions":[]}"#);
    }

    #[test]
    fn test_snapshot_error_json_shape() {
        let json = SnapshotReport::capture_failed().to_json().unwrap();
        assert_eq!(json, r#"{"error":"Could not capture frame"}"#);
    }
}
