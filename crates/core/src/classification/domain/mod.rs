pub mod emotion_classifier;
pub mod region_normalizer;
