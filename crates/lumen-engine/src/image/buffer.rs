use std::borrow::Cow;

use super::element::{self, Element, PixelFormat};
use super::ImageError;

/// Shape of a pixel buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub format: PixelFormat,
}

impl ImageSpec {
    pub const fn new(width: u32, height: u32, channels: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            channels,
            format,
        }
    }

    /// Bytes per pixel.
    #[inline]
    pub const fn pixel_bytes(&self) -> usize {
        self.channels as usize * self.format.size()
    }

    #[inline]
    pub const fn row_bytes(&self) -> usize {
        self.width as usize * self.pixel_bytes()
    }

    /// Total payload size, `None` on overflow.
    pub fn byte_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.channels as usize)?
            .checked_mul(self.format.size())
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.channels == 0
    }

    fn checked_len(&self) -> Result<usize, ImageError> {
        self.byte_len().ok_or(ImageError::TooLarge {
            width: self.width,
            height: self.height,
            channels: self.channels,
        })
    }
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self::new(0, 0, 4, PixelFormat::U8)
    }
}

/// Pixel rectangle in buffer coordinates.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn full(spec: &ImageSpec) -> Self {
        Self::new(0, 0, spec.width, spec.height)
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }

    /// Intersection with the buffer bounds of `spec`.
    pub fn clamp_to(&self, spec: &ImageSpec) -> Self {
        let x = self.x.min(spec.width);
        let y = self.y.min(spec.height);
        let width = self.width.min(spec.width - x);
        let height = self.height.min(spec.height - y);
        Self::new(x, y, width, height)
    }
}

/// An owned, row-major pixel buffer.
///
/// The defined region marks which pixels carry data; writes such as
/// [`ImageBuf::fill`] only touch pixels inside it. It covers the whole buffer
/// unless narrowed with [`ImageBuf::set_defined_region`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageBuf {
    spec: ImageSpec,
    data: Vec<u8>,
    defined: Region,
}

impl ImageBuf {
    /// Zero-filled buffer of the given shape.
    pub fn new(spec: ImageSpec) -> Result<Self, ImageError> {
        let len = spec.checked_len()?;
        Ok(Self {
            spec,
            data: vec![0; len],
            defined: Region::full(&spec),
        })
    }

    /// Wraps existing bytes; `data` must match the shape exactly.
    pub fn from_raw(spec: ImageSpec, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = spec.checked_len()?;
        if data.len() != expected {
            return Err(size_mismatch(&spec, expected, data.len()));
        }
        Ok(Self {
            spec,
            data,
            defined: Region::full(&spec),
        })
    }

    /// Square RGBA8 calibration checkerboard.
    pub fn checkerboard(size: u32, cell: u32) -> Self {
        let spec = ImageSpec::new(size, size, 4, PixelFormat::U8);
        let cell = cell.max(1);
        let mut data = Vec::with_capacity(spec.byte_len().unwrap_or(0));
        for y in 0..size {
            for x in 0..size {
                let on_border = x == 0 || y == 0 || x + 1 == size || y + 1 == size;
                let v = if on_border {
                    255
                } else if ((x / cell) + (y / cell)) % 2 == 0 {
                    224
                } else {
                    64
                };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Self {
            spec,
            data,
            defined: Region::full(&spec),
        }
    }

    #[inline]
    pub fn spec(&self) -> ImageSpec {
        self.spec
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn defined_region(&self) -> Region {
        self.defined
    }

    pub fn set_defined_region(&mut self, region: Region) {
        self.defined = region.clamp_to(&self.spec);
    }

    /// Bytes of pixel `(x, y)`, `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.spec.width || y >= self.spec.height {
            return None;
        }
        let px = self.spec.pixel_bytes();
        let start = y as usize * self.spec.row_bytes() + x as usize * px;
        self.data.get(start..start + px)
    }

    /// Writes `value` into every channel of every pixel in the defined region.
    pub fn fill<T: Element>(&mut self, value: T) {
        let px = self.spec.pixel_bytes();
        if px == 0 || self.data.is_empty() {
            return;
        }

        let elem = self.spec.format.size();
        let mut pattern = vec![0u8; px];
        for chunk in pattern.chunks_exact_mut(elem) {
            element::encode(value, self.spec.format, chunk);
        }

        if self.defined == Region::full(&self.spec) {
            for dst in self.data.chunks_exact_mut(px) {
                dst.copy_from_slice(&pattern);
            }
            return;
        }

        let row = self.spec.row_bytes();
        let r = self.defined;
        for y in r.y..r.y + r.height {
            let start = y as usize * row + r.x as usize * px;
            let end = start + r.width as usize * px;
            for dst in self.data[start..end].chunks_exact_mut(px) {
                dst.copy_from_slice(&pattern);
            }
        }
    }

    /// Replaces shape and contents with `pixels`, reusing the allocation.
    pub(crate) fn assign_raw(&mut self, spec: ImageSpec, pixels: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(pixels);
        self.spec = spec;
        self.defined = Region::full(&spec);
    }

    /// Converts to tightly packed RGBA8 for GPU upload.
    ///
    /// One channel expands to grey, two to grey + alpha, three gain an opaque
    /// alpha; extra channels beyond four are dropped.
    pub fn to_rgba8(&self) -> Cow<'_, [u8]> {
        let spec = self.spec;
        if spec.channels == 4 && spec.format == PixelFormat::U8 {
            return Cow::Borrowed(&self.data);
        }

        let pixels = spec.width as usize * spec.height as usize;
        let mut out = Vec::with_capacity(pixels * 4);
        if spec.channels == 0 {
            out.resize(pixels * 4, 0);
            return Cow::Owned(out);
        }

        let elem = spec.format.size();
        let to_u8 = |bytes: &[u8]| -> u8 {
            match spec.format {
                PixelFormat::U8 => bytes[0],
                _ => (element::decode(spec.format, bytes).clamp(0.0, 1.0) * 255.0).round() as u8,
            }
        };

        for px in self.data.chunks_exact(spec.pixel_bytes()) {
            let c = |i: usize| to_u8(&px[i * elem..(i + 1) * elem]);
            let rgba = match spec.channels {
                1 => [c(0), c(0), c(0), 255],
                2 => [c(0), c(0), c(0), c(1)],
                3 => [c(0), c(1), c(2), 255],
                _ => [c(0), c(1), c(2), c(3)],
            };
            out.extend_from_slice(&rgba);
        }
        Cow::Owned(out)
    }
}

impl TryFrom<image::DynamicImage> for ImageBuf {
    type Error = ImageError;

    fn try_from(img: image::DynamicImage) -> Result<Self, Self::Error> {
        use image::DynamicImage as D;

        let (width, height) = (img.width(), img.height());
        let (channels, format, bytes) = match img {
            D::ImageLuma8(b) => (1, PixelFormat::U8, b.into_raw()),
            D::ImageLumaA8(b) => (2, PixelFormat::U8, b.into_raw()),
            D::ImageRgb8(b) => (3, PixelFormat::U8, b.into_raw()),
            D::ImageRgba8(b) => (4, PixelFormat::U8, b.into_raw()),
            D::ImageLuma16(b) => (1, PixelFormat::U16, bytemuck::cast_slice(&b.into_raw()).to_vec()),
            D::ImageLumaA16(b) => (2, PixelFormat::U16, bytemuck::cast_slice(&b.into_raw()).to_vec()),
            D::ImageRgb16(b) => (3, PixelFormat::U16, bytemuck::cast_slice(&b.into_raw()).to_vec()),
            D::ImageRgba16(b) => (4, PixelFormat::U16, bytemuck::cast_slice(&b.into_raw()).to_vec()),
            D::ImageRgb32F(b) => (3, PixelFormat::F32, bytemuck::cast_slice(&b.into_raw()).to_vec()),
            D::ImageRgba32F(b) => (4, PixelFormat::F32, bytemuck::cast_slice(&b.into_raw()).to_vec()),
            other => (4, PixelFormat::U8, other.to_rgba8().into_raw()),
        };

        ImageBuf::from_raw(ImageSpec::new(width, height, channels, format), bytes)
    }
}

pub(crate) fn size_mismatch(spec: &ImageSpec, expected: usize, actual: usize) -> ImageError {
    ImageError::SizeMismatch {
        width: spec.width,
        height: spec.height,
        channels: spec.channels,
        format: spec.format,
        expected,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_respects_defined_region() {
        let spec = ImageSpec::new(4, 4, 1, PixelFormat::U8);
        let mut buf = ImageBuf::new(spec).unwrap();
        buf.set_defined_region(Region::new(1, 1, 2, 2));
        buf.fill(9u8);

        for y in 0..4 {
            for x in 0..4 {
                let expected = if (1..3).contains(&x) && (1..3).contains(&y) { 9 } else { 0 };
                assert_eq!(buf.pixel(x, y), Some(&[expected][..]), "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn defined_region_is_clamped_to_bounds() {
        let mut buf = ImageBuf::new(ImageSpec::new(4, 4, 1, PixelFormat::U8)).unwrap();
        buf.set_defined_region(Region::new(3, 2, 10, 10));
        assert_eq!(buf.defined_region(), Region::new(3, 2, 1, 2));
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let spec = ImageSpec::new(2, 2, 3, PixelFormat::U16);
        let err = ImageBuf::from_raw(spec, vec![0; 23]).unwrap_err();
        assert!(matches!(err, ImageError::SizeMismatch { expected: 24, actual: 23, .. }));
    }

    #[test]
    fn rgba8_borrows_when_already_packed() {
        let buf = ImageBuf::from_raw(ImageSpec::new(1, 1, 4, PixelFormat::U8), vec![1, 2, 3, 4]).unwrap();
        assert!(matches!(buf.to_rgba8(), Cow::Borrowed(_)));
    }

    #[test]
    fn rgba8_expands_grey_and_float() {
        let grey = ImageBuf::from_raw(ImageSpec::new(1, 1, 1, PixelFormat::U8), vec![7]).unwrap();
        assert_eq!(&*grey.to_rgba8(), &[7, 7, 7, 255]);

        let mut float = ImageBuf::new(ImageSpec::new(1, 1, 3, PixelFormat::F32)).unwrap();
        float.fill(1.0f32);
        assert_eq!(&*float.to_rgba8(), &[255, 255, 255, 255]);
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let buf = ImageBuf::checkerboard(16, 4);
        assert_eq!(buf.pixel(1, 1), Some(&[224, 224, 224, 255][..]));
        assert_eq!(buf.pixel(5, 1), Some(&[64, 64, 64, 255][..]));
        assert_eq!(buf.pixel(0, 5), Some(&[255, 255, 255, 255][..]));
    }
}
