//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames for presentation
//! - collecting asynchronous device errors

mod error;
mod gpu;

pub use error::{GpuErrorSink, SurfaceErrorAction};
pub use gpu::{Gpu, GpuFrame, GpuInit};
