use crate::shared::detection::FrameResult;

/// Consumes pipeline results, one per processed frame.
pub trait FrameSink: Send {
    fn write(&mut self, result: FrameResult) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes and releases the sink. Called once, after the last `write`.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
