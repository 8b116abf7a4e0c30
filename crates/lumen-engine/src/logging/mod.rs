//! Logging utilities.
//!
//! The `log` facade is used everywhere. [`init_logging`] installs an
//! `env_logger` backend and returns a [`LogSink`] holding the operator-facing
//! lines, which the control overlay displays.

mod init;
mod sink;

pub use init::{init_logging, LoggingConfig};
pub use sink::{LogLevel, LogLine, LogSink};
