use std::path::PathBuf;

use thiserror::Error;

use super::ShaderStage;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage:?} stage of '{program}' failed to compile:\n{log}")]
    Compile {
        program: String,
        stage: ShaderStage,
        log: String,
    },

    #[error("program '{program}' has no compiled {stage:?} stage")]
    MissingStage { program: String, stage: ShaderStage },

    #[error("program '{program}' is not linked")]
    NotLinked { program: String },
}
