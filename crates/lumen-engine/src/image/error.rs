use std::path::PathBuf;

use thiserror::Error;

use super::PixelFormat;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("serialized image is truncated: {len} bytes, header needs {needed}")]
    TruncatedHeader { len: usize, needed: usize },

    #[error("unknown pixel format tag {0}")]
    UnknownFormat(u32),

    #[error(
        "payload is {actual} bytes but {width}x{height}x{channels} {format:?} needs {expected}"
    )]
    SizeMismatch {
        width: u32,
        height: u32,
        channels: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },

    #[error("image dimensions {width}x{height}x{channels} overflow addressable memory")]
    TooLarge {
        width: u32,
        height: u32,
        channels: u32,
    },

    #[error("failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
