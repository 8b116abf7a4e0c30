//! Shared pixel buffers.
//!
//! [`Image`] is the hand-off point between producer threads (file decoders,
//! network receivers) and the render thread, which turns it into a
//! [`Texture`](crate::texture::Texture).

mod buffer;
mod element;
mod error;
mod serial;
mod shared;

pub use buffer::{ImageBuf, ImageSpec, Region};
pub use element::{Element, PixelFormat};
pub use error::ImageError;
pub use serial::SerializedObject;
pub use shared::{BufferObject, Image, ImageGuard};
