use std::sync::OnceLock;

use super::sink::{LogLevel, LogSink};

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "lumen_engine=debug,wgpu=warn").
///
/// `write_style` controls ANSI coloring behavior.
///
/// `capture_capacity` bounds how many lines the returned [`LogSink`] keeps.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub capture_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            capture_capacity: 1024,
        }
    }
}

static SINK: OnceLock<LogSink> = OnceLock::new();

/// Forwards to `env_logger` and mirrors user-facing records into a [`LogSink`].
struct CaptureLogger {
    inner: env_logger::Logger,
    sink: LogSink,
}

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);

        let level = LogLevel::from(record.level());
        if level != LogLevel::Debug {
            self.sink.push(level, record.args().to_string());
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initializes the global logger once and returns the shared capture sink.
///
/// This function is idempotent; subsequent calls return the same sink and
/// ignore `config`. Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) -> LogSink {
    SINK.get_or_init(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.env_filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);

        let inner = builder.build();
        let max_level = inner.filter();
        let sink = LogSink::with_capacity(config.capture_capacity);
        let logger = CaptureLogger {
            inner,
            sink: sink.clone(),
        };

        // Another logger may already be installed (test harnesses); the sink
        // then stays empty but remains usable.
        if log::set_logger(Box::leak(Box::new(logger))).is_ok() {
            log::set_max_level(max_level);
            log::debug!("logging initialized");
        }
        sink
    })
    .clone()
}
