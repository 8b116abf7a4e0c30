use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

/// Severity as shown to the operator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum LogLevel {
    Debug,
    Message,
    Warning,
    Error,
}

impl LogLevel {
    /// Levels displayed by the overlay log view.
    pub const VISIBLE: [LogLevel; 3] = [LogLevel::Message, LogLevel::Warning, LogLevel::Error];

    pub const fn label(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Message => "MESSAGE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Info => LogLevel::Message,
            log::Level::Debug | log::Level::Trace => LogLevel::Debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    pub time: SystemTime,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self
            .time
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() % 86_400)
            .unwrap_or(0);
        write!(
            f,
            "[{:02}:{:02}:{:02}] [{}] {}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60,
            self.level.label(),
            self.message
        )
    }
}

struct Inner {
    lines: Mutex<VecDeque<LogLine>>,
    capacity: usize,
}

/// Bounded, shareable ring of captured log lines.
///
/// Cloning yields another handle to the same ring.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Inner>,
}

impl LogSink {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                lines: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
                capacity,
            }),
        }
    }

    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let mut lines = self.inner.lines.lock();
        if lines.len() == self.inner.capacity {
            lines.pop_front();
        }
        lines.push_back(LogLine {
            level,
            message: message.into(),
            time: SystemTime::now(),
        });
    }

    /// Lines whose level is one of `levels`, oldest first.
    pub fn logs(&self, levels: &[LogLevel]) -> Vec<LogLine> {
        self.inner
            .lines
            .lock()
            .iter()
            .filter(|l| levels.contains(&l.level))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_level() {
        let sink = LogSink::with_capacity(8);
        sink.push(LogLevel::Debug, "d");
        sink.push(LogLevel::Message, "m");
        sink.push(LogLevel::Error, "e");

        let visible: Vec<_> = sink
            .logs(&LogLevel::VISIBLE)
            .into_iter()
            .map(|l| l.message)
            .collect();
        assert_eq!(visible, ["m", "e"]);
    }

    #[test]
    fn drops_oldest_when_full() {
        let sink = LogSink::with_capacity(2);
        for m in ["a", "b", "c"] {
            sink.push(LogLevel::Message, m);
        }
        let all: Vec<_> = sink.logs(&[LogLevel::Message]).into_iter().map(|l| l.message).collect();
        assert_eq!(all, ["b", "c"]);
    }

    #[test]
    fn maps_log_levels() {
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Debug);
        assert_eq!(LogLevel::from(log::Level::Info), LogLevel::Message);
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warning);
    }

    #[test]
    fn display_includes_level_label() {
        let sink = LogSink::default();
        sink.push(LogLevel::Warning, "texture too large");
        let line = sink.logs(&[LogLevel::Warning]).remove(0).to_string();
        assert!(line.ends_with("[WARNING] texture too large"), "{line}");
    }
}
