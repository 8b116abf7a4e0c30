//! GPU textures fed from [`Image`](crate::image::Image) buffers.

mod spec;
mod texture;

pub use spec::{TextureFormat, TextureSpec};
pub use texture::{Texture, TextureId};
