pub mod infrastructure;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod recognize_emotions_use_case;
pub mod snapshot_use_case;
pub mod stream_emotions_use_case;
