//! GPU rendering plumbing shared by textures, cameras and the overlay.
//!
//! Convention: offscreen targets are `Rgba8Unorm` color with `Depth32Float`
//! depth; image rows are top-down, matching texture coordinates.

mod blit;
mod ctx;
mod error;

pub use blit::{BlendMode, Blitter};
pub use ctx::RenderCtx;
pub use error::RenderError;
