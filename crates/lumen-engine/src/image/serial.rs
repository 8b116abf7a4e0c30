use bytemuck::{Pod, Zeroable};

use super::buffer::{size_mismatch, ImageBuf, ImageSpec};
use super::{ImageError, PixelFormat};

/// Fixed header in front of every serialized image. All fields are little-endian.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Header {
    width: u32,
    height: u32,
    channels: u32,
    format: u32,
}

const HEADER_LEN: usize = std::mem::size_of::<Header>();

/// Opaque byte blob produced by [`BufferObject::serialize`](super::BufferObject::serialize).
///
/// Layout: `[u32 width][u32 height][u32 channels][u32 format tag]` followed by
/// the row-major pixel bytes.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SerializedObject(Vec<u8>);

impl SerializedObject {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SerializedObject {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

pub(crate) fn encode(buf: &ImageBuf) -> SerializedObject {
    let spec = buf.spec();
    let header = Header {
        width: spec.width.to_le(),
        height: spec.height.to_le(),
        channels: spec.channels.to_le(),
        format: spec.format.tag().to_le(),
    };

    let mut out = Vec::with_capacity(HEADER_LEN + buf.data().len());
    out.extend_from_slice(bytemuck::bytes_of(&header));
    out.extend_from_slice(buf.data());
    SerializedObject(out)
}

/// Checks the header and payload length without allocating.
pub(crate) fn decode(obj: &SerializedObject) -> Result<(ImageSpec, &[u8]), ImageError> {
    let bytes = obj.as_bytes();
    if bytes.len() < HEADER_LEN {
        return Err(ImageError::TruncatedHeader {
            len: bytes.len(),
            needed: HEADER_LEN,
        });
    }

    let header: Header = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
    let tag = u32::from_le(header.format);
    let format = PixelFormat::from_tag(tag).ok_or(ImageError::UnknownFormat(tag))?;
    let spec = ImageSpec::new(
        u32::from_le(header.width),
        u32::from_le(header.height),
        u32::from_le(header.channels),
        format,
    );

    let expected = spec.byte_len().ok_or(ImageError::TooLarge {
        width: spec.width,
        height: spec.height,
        channels: spec.channels,
    })?;
    let pixels = &bytes[HEADER_LEN..];
    if pixels.len() != expected {
        return Err(size_mismatch(&spec, expected, pixels.len()));
    }
    Ok((spec, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(width: u32, height: u32, channels: u32, tag: u32, payload: usize) -> SerializedObject {
        let mut v = Vec::new();
        for f in [width, height, channels, tag] {
            v.extend_from_slice(&f.to_le_bytes());
        }
        v.resize(v.len() + payload, 0xAB);
        SerializedObject::from_bytes(v)
    }

    #[test]
    fn header_is_little_endian() {
        let buf = ImageBuf::new(ImageSpec::new(3, 2, 1, PixelFormat::U16)).unwrap();
        let obj = encode(&buf);
        assert_eq!(&obj.as_bytes()[..4], &3u32.to_le_bytes());
        assert_eq!(&obj.as_bytes()[12..16], &2u32.to_le_bytes());
        assert_eq!(obj.len(), HEADER_LEN + 12);
    }

    #[test]
    fn rejects_short_header() {
        let obj = SerializedObject::from_bytes(vec![0; 15]);
        assert!(matches!(decode(&obj), Err(ImageError::TruncatedHeader { len: 15, .. })));
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(matches!(decode(&blob(1, 1, 1, 9, 1)), Err(ImageError::UnknownFormat(9))));
    }

    #[test]
    fn rejects_payload_length_mismatch() {
        assert!(matches!(decode(&blob(4, 4, 4, 1, 63)), Err(ImageError::SizeMismatch { .. })));
        assert!(matches!(decode(&blob(4, 4, 4, 1, 65)), Err(ImageError::SizeMismatch { .. })));
        assert!(decode(&blob(4, 4, 4, 1, 64)).is_ok());
    }
}
