//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and windows, and wires them to the GPU layer.

mod runtime;
mod translate;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
