//! Shader programs used by cameras to draw projected objects.
//!
//! A program moves through [`ShaderState`]s: attaching a source marks it
//! `Compiling`, a successful link makes it `Linked`, any compile or link
//! error makes it `Failed` until a source changes again.

mod error;
mod program;
pub mod shading;
mod vertex;

pub use error::ShaderError;
pub use program::{ShaderProgram, ShaderStage, ShaderState, Sideness, MAX_TEXTURE_UNITS};
pub use vertex::Vertex;
