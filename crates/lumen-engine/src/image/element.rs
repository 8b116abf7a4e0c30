/// Storage type of a single channel value.
///
/// The numeric tags are part of the serialized buffer format and must stay stable.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    #[default]
    U8,
    U16,
    F32,
}

impl PixelFormat {
    /// Size of one channel value in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            PixelFormat::U8 => 1,
            PixelFormat::U16 => 2,
            PixelFormat::F32 => 4,
        }
    }

    /// Wire tag used by [`SerializedObject`](super::SerializedObject).
    #[inline]
    pub const fn tag(self) -> u32 {
        match self {
            PixelFormat::U8 => 1,
            PixelFormat::U16 => 2,
            PixelFormat::F32 => 3,
        }
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(PixelFormat::U8),
            2 => Some(PixelFormat::U16),
            3 => Some(PixelFormat::F32),
            _ => None,
        }
    }
}

/// A channel value that can be written into any [`PixelFormat`].
///
/// Conversion goes through the normalized `[0, 1]` range, so `255u8` fills a
/// `F32` buffer with `1.0` and a `U16` buffer with `65535`.
pub trait Element: Copy + Send + 'static {
    const FORMAT: PixelFormat;

    fn to_normalized(self) -> f32;
}

impl Element for u8 {
    const FORMAT: PixelFormat = PixelFormat::U8;

    #[inline]
    fn to_normalized(self) -> f32 {
        self as f32 / 255.0
    }
}

impl Element for u16 {
    const FORMAT: PixelFormat = PixelFormat::U16;

    #[inline]
    fn to_normalized(self) -> f32 {
        self as f32 / 65535.0
    }
}

impl Element for f32 {
    const FORMAT: PixelFormat = PixelFormat::F32;

    #[inline]
    fn to_normalized(self) -> f32 {
        self
    }
}

/// Encodes `value` as one channel of `format` into `dst` (native byte order).
pub(crate) fn encode<T: Element>(value: T, format: PixelFormat, dst: &mut [u8]) {
    // Same-type writes keep the exact value; only cross-type writes normalize.
    if T::FORMAT == format {
        match format {
            PixelFormat::U8 => dst[0] = (value.to_normalized() * 255.0).round() as u8,
            PixelFormat::U16 => {
                let v = (value.to_normalized() * 65535.0).round() as u16;
                dst[..2].copy_from_slice(&v.to_ne_bytes());
            }
            PixelFormat::F32 => dst[..4].copy_from_slice(&value.to_normalized().to_ne_bytes()),
        }
        return;
    }

    let n = value.to_normalized();
    match format {
        PixelFormat::U8 => dst[0] = (n.clamp(0.0, 1.0) * 255.0).round() as u8,
        PixelFormat::U16 => {
            let v = (n.clamp(0.0, 1.0) * 65535.0).round() as u16;
            dst[..2].copy_from_slice(&v.to_ne_bytes());
        }
        PixelFormat::F32 => dst[..4].copy_from_slice(&n.to_ne_bytes()),
    }
}

/// Reads one channel of `format` from `src` as a normalized value.
pub(crate) fn decode(format: PixelFormat, src: &[u8]) -> f32 {
    match format {
        PixelFormat::U8 => src[0] as f32 / 255.0,
        PixelFormat::U16 => u16::from_ne_bytes([src[0], src[1]]) as f32 / 65535.0,
        PixelFormat::F32 => f32::from_ne_bytes([src[0], src[1], src[2], src[3]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for f in [PixelFormat::U8, PixelFormat::U16, PixelFormat::F32] {
            assert_eq!(PixelFormat::from_tag(f.tag()), Some(f));
        }
        assert_eq!(PixelFormat::from_tag(0), None);
        assert_eq!(PixelFormat::from_tag(4), None);
    }

    #[test]
    fn cross_type_encode_normalizes() {
        let mut b = [0u8; 4];
        encode(255u8, PixelFormat::F32, &mut b);
        assert_eq!(f32::from_ne_bytes(b), 1.0);

        encode(1.0f32, PixelFormat::U16, &mut b);
        assert_eq!(u16::from_ne_bytes([b[0], b[1]]), 65535);

        encode(2.5f32, PixelFormat::U8, &mut b);
        assert_eq!(b[0], 255);
    }

    #[test]
    fn same_type_float_is_not_clamped() {
        let mut b = [0u8; 4];
        encode(2.5f32, PixelFormat::F32, &mut b);
        assert_eq!(f32::from_ne_bytes(b), 2.5);
    }
}
