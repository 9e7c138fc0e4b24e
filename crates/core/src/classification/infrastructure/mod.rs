pub mod label_manifest;
pub mod onnx_emotion_classifier;
