use std::sync::Arc;

use parking_lot::Mutex;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Collects uncaptured wgpu errors so the render thread can poll them.
///
/// wgpu reports validation and out-of-memory errors asynchronously; without a
/// handler they abort the process. Errors pile up here until
/// [`GpuErrorSink::drain`] is called.
#[derive(Clone, Default)]
pub struct GpuErrorSink {
    errors: Arc<Mutex<Vec<String>>>,
}

impl GpuErrorSink {
    /// Installs the sink as `device`'s uncaptured error handler.
    pub fn install(device: &wgpu::Device) -> Self {
        let sink = Self::default();
        let errors = Arc::clone(&sink.errors);
        device.on_uncaptured_error(Arc::new(move |err: wgpu::Error| {
            errors.lock().push(err.to_string());
        }));
        sink
    }

    pub fn push(&self, message: impl Into<String>) {
        self.errors.lock().push(message.into());
    }

    /// Takes every error recorded since the previous drain.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.errors.lock())
    }

    /// Number of errors waiting to be drained.
    pub fn pending(&self) -> usize {
        self.errors.lock().len()
    }

    /// Drops the errors recorded after `mark`, a previous [`pending`](Self::pending).
    pub fn discard_since(&self, mark: usize) {
        self.errors.lock().truncate(mark);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl std::fmt::Debug for GpuErrorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuErrorSink")
            .field("pending", &self.errors.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_sink() {
        let sink = GpuErrorSink::default();
        let clone = sink.clone();
        clone.push("validation error");
        assert!(!sink.is_empty());
        assert_eq!(sink.drain(), ["validation error"]);
        assert!(sink.is_empty());
    }

    #[test]
    fn discard_since_keeps_earlier_errors() {
        let sink = GpuErrorSink::default();
        sink.push("upload failed");
        let mark = sink.pending();
        sink.push("bad shader");
        sink.push("bad shader again");
        sink.discard_since(mark);
        assert_eq!(sink.drain(), ["upload failed"]);
    }
}
