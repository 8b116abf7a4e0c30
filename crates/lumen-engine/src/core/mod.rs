//! Core engine-facing contracts.
//!
//! The stable interface between the window runtime and the layers above it
//! (overlay, world loop, studio).

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
