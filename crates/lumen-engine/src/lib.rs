//! Lumen engine crate.
//!
//! Platform and GPU runtime (device, window, input, timing, logging) plus the
//! projection pipeline: shared pixel buffers, GPU textures, shader programs,
//! cameras and the scene arena that ties them together.

pub mod core;
pub mod device;
pub mod image;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod shader;
pub mod text;
pub mod texture;
pub mod time;
pub mod window;
