use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::shared::detection::FrameResult;
use crate::video::domain::frame_sink::FrameSink;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Moves JPEG encoding and output off the processing thread.
///
/// Layout: `main [acquire/localize/classify/annotate] → writer`
///
/// Results are handed over through a bounded channel, so a slow consumer
/// applies backpressure instead of buffering without limit. The first
/// writer error surfaces on the next `write` or on `close`.
pub struct ThreadedFrameSink {
    tx: Option<Sender<FrameResult>>,
    handle: Option<JoinHandle<Result<Box<dyn FrameSink>, SendError>>>,
}

impl ThreadedFrameSink {
    pub fn new(inner: Box<dyn FrameSink>) -> Self {
        Self::with_capacity(inner, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(inner: Box<dyn FrameSink>, capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<FrameResult>(capacity.max(1));
        let handle = spawn_writer(inner, rx);
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Waits for the writer thread and returns the inner sink.
    fn join(&mut self) -> Result<Option<Box<dyn FrameSink>>, Box<dyn std::error::Error>> {
        self.tx = None;
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        match handle.join() {
            Ok(Ok(sink)) => Ok(Some(sink)),
            Ok(Err(e)) => Err(e.to_string().into()),
            Err(_) => Err("writer thread panicked".into()),
        }
    }
}

fn spawn_writer(
    mut sink: Box<dyn FrameSink>,
    rx: crossbeam_channel::Receiver<FrameResult>,
) -> JoinHandle<Result<Box<dyn FrameSink>, SendError>> {
    std::thread::spawn(move || {
        for result in rx {
            sink.write(result)
                .map_err(|e| -> SendError { e.to_string().into() })?;
        }
        Ok(sink)
    })
}

impl FrameSink for ThreadedFrameSink {
    fn write(&mut self, result: FrameResult) -> Result<(), Box<dyn std::error::Error>> {
        let Some(tx) = &self.tx else {
            return Err("frame sink already closed".into());
        };
        if tx.send(result).is_ok() {
            return Ok(());
        }
        // The receiver only disconnects when the writer thread stopped early.
        self.join()?;
        Err("writer thread stopped".into())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(mut sink) = self.join()? {
            sink.close()?;
        }
        Ok(())
    }
}

impl Drop for ThreadedFrameSink {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.close() {
                log::warn!("Frame sink closed with error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        indices: Arc<Mutex<Vec<usize>>>,
        closed: Arc<AtomicBool>,
        fail_at: Option<usize>,
    }

    impl FrameSink for RecordingSink {
        fn write(&mut self, result: FrameResult) -> Result<(), Box<dyn std::error::Error>> {
            let index = result.annotated.index();
            if self.fail_at == Some(index) {
                return Err(format!("broken pipe at {index}").into());
            }
            self.indices.lock().unwrap().push(index);
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn recording(fail_at: Option<usize>) -> (RecordingSink, Arc<Mutex<Vec<usize>>>, Arc<AtomicBool>) {
        let indices = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let sink = RecordingSink {
            indices: indices.clone(),
            closed: closed.clone(),
            fail_at,
        };
        (sink, indices, closed)
    }

    fn result(index: usize) -> FrameResult {
        FrameResult {
            annotated: Frame::new(vec![0; 4 * 4 * 3], 4, 4, 3, index),
            detections: Vec::new(),
        }
    }

    #[test]
    fn test_forwards_in_order_and_closes_inner() {
        let (inner, indices, closed) = recording(None);
        let mut sink = ThreadedFrameSink::with_capacity(Box::new(inner), 2);

        for i in 0..20 {
            sink.write(result(i)).unwrap();
        }
        sink.close().unwrap();

        assert_eq!(*indices.lock().unwrap(), (0..20).collect::<Vec<_>>());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_writer_error_surfaces() {
        let (inner, _, closed) = recording(Some(3));
        let mut sink = ThreadedFrameSink::with_capacity(Box::new(inner), 1);

        // The failure shows up either on a later write or on close.
        let mut error = None;
        for i in 0..50 {
            if let Err(e) = sink.write(result(i)) {
                error = Some(e.to_string());
                break;
            }
        }
        let error = match error {
            Some(e) => e,
            None => sink.close().unwrap_err().to_string(),
        };
        assert!(error.contains("broken pipe at 3"), "got: {error}");
        assert!(!closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_write_after_close_fails() {
        let (inner, _, _) = recording(None);
        let mut sink = ThreadedFrameSink::new(Box::new(inner));
        sink.close().unwrap();
        assert!(sink.write(result(0)).is_err());
    }

    #[test]
    fn test_drop_closes_inner() {
        let (inner, indices, closed) = recording(None);
        {
            let mut sink = ThreadedFrameSink::new(Box::new(inner));
            sink.write(result(7)).unwrap();
        }
        assert_eq!(*indices.lock().unwrap(), vec![7]);
        assert!(closed.load(Ordering::SeqCst));
    }
}
