/// Side length of the square classifier input, in pixels.
pub const CLASSIFIER_INPUT_SIZE: u32 = 48;

/// Shrink ratio between consecutive cascade scan scales.
pub const CASCADE_SCALE_FACTOR: f64 = 1.3;

/// Overlapping detections required to keep a candidate face.
pub const CASCADE_MIN_NEIGHBORS: usize = 5;

/// Allowed deviation of a classifier distribution's sum from 1.
pub const DISTRIBUTION_TOLERANCE: f32 = 1e-4;

/// Bounding-box outline color (RGB).
pub const BOX_COLOR: [u8; 3] = [0, 0, 255];

/// Label text color (RGB).
pub const LABEL_COLOR: [u8; 3] = [0, 255, 0];

pub const BOX_THICKNESS: u32 = 2;

/// Gap between the label's bottom edge and the box's top edge.
pub const LABEL_OFFSET: u32 = 10;

/// Integer upscale applied to the built-in 5x7 glyphs.
pub const LABEL_SCALE: u32 = 2;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

pub const MJPEG_BOUNDARY: &str = "frame";
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Suffix appended to a model path to locate its label manifest.
pub const LABEL_MANIFEST_SUFFIX: &str = "labels.json";
pub const LABEL_MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Message reported by snapshot queries when no frame could be read.
pub const CAPTURE_FAILED_MESSAGE: &str = "Could not capture frame";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
