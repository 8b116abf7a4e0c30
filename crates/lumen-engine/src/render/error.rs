use thiserror::Error;

use crate::shader::ShaderError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{stage}: gpu error: {message}")]
    Gpu { stage: &'static str, message: String },

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("texture {width}x{height} exceeds the device limit of {limit}")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },
}
