use std::path::Path;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};

use super::buffer::{ImageBuf, ImageSpec};
use super::element::{Element, PixelFormat};
use super::serial::{self, SerializedObject};
use super::ImageError;

/// Something that can be shipped between processes and published to the GPU.
pub trait BufferObject: Send + Sync {
    fn serialize(&self) -> SerializedObject;

    /// Replaces the contents from a blob. Malformed input leaves state untouched.
    fn deserialize(&self, obj: &SerializedObject) -> Result<(), ImageError>;

    /// Publishes pending changes. Returns `true` when new content awaits upload.
    fn update(&self) -> bool;

    /// Time of the last write.
    fn timestamp(&self) -> Instant;
}

struct Buffers {
    image: ImageBuf,
    // Spare allocation swapped in on whole-buffer writes.
    staging: ImageBuf,
    timestamp: Instant,
    updated: bool,
}

impl Buffers {
    fn new(image: ImageBuf) -> Self {
        Self {
            image,
            staging: ImageBuf::default(),
            timestamp: Instant::now(),
            updated: true,
        }
    }

    /// Promotes `staging` to the published buffer.
    fn publish_staging(&mut self) {
        std::mem::swap(&mut self.image, &mut self.staging);
        self.mark();
    }

    fn mark(&mut self) {
        self.timestamp = Instant::now();
        self.updated = true;
    }
}

/// Thread-safe, double-buffered pixel buffer.
///
/// Producer threads write through `&self`; the render thread reads under
/// [`Image::lock`] for as long as it needs to copy the pixels out. The lock is
/// not reentrant: calling any other method while holding an [`ImageGuard`] on
/// the same thread deadlocks.
pub struct Image {
    buffers: Mutex<Buffers>,
}

/// RAII read access to an [`Image`]. Dropping it releases the lock.
pub struct ImageGuard<'a> {
    inner: MutexGuard<'a, Buffers>,
}

impl ImageGuard<'_> {
    pub fn spec(&self) -> ImageSpec {
        self.inner.image.spec()
    }

    pub fn data(&self) -> &[u8] {
        self.inner.image.data()
    }

    pub fn buffer(&self) -> &ImageBuf {
        &self.inner.image
    }

    pub fn timestamp(&self) -> Instant {
        self.inner.timestamp
    }
}

impl Image {
    /// Empty image (0x0 RGBA8).
    pub fn new() -> Self {
        Self::from(ImageBuf::default())
    }

    /// Calibration checkerboard shown until a real source arrives.
    pub fn with_default_pattern() -> Self {
        Self::from(ImageBuf::checkerboard(512, 64))
    }

    pub fn lock(&self) -> ImageGuard<'_> {
        ImageGuard {
            inner: self.buffers.lock(),
        }
    }

    pub fn spec(&self) -> ImageSpec {
        self.buffers.lock().image.spec()
    }

    /// Deep copy of the published buffer.
    pub fn get(&self) -> ImageBuf {
        self.buffers.lock().image.clone()
    }

    /// Copies `buf` into the image.
    pub fn set(&self, buf: &ImageBuf) {
        let mut b = self.buffers.lock();
        b.staging.clone_from(buf);
        b.publish_staging();
    }

    /// Replaces the contents with a zeroed buffer of the given shape.
    pub fn set_empty(
        &self,
        width: u32,
        height: u32,
        channels: u32,
        format: PixelFormat,
    ) -> Result<(), ImageError> {
        let mut fresh = ImageBuf::new(ImageSpec::new(width, height, channels, format))?;
        let mut b = self.buffers.lock();
        std::mem::swap(&mut b.staging, &mut fresh);
        b.publish_staging();
        drop(b);
        // `fresh` now holds the retired staging allocation; freed outside the lock.
        drop(fresh);
        Ok(())
    }

    /// Fills the defined region with `value`, converted to the buffer's element type.
    pub fn set_to<T: Element>(&self, value: T) {
        let mut b = self.buffers.lock();
        b.image.fill(value);
        b.mark();
    }

    /// Decodes an image file. On failure the previous contents are kept.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| ImageError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buf = ImageBuf::try_from(decoded)?;
        log::debug!("read '{}': {:?}", path.display(), buf.spec());
        self.swap_buffer(&mut buf);
        Ok(())
    }

    /// Exchanges the published buffer with `buf` without copying pixels.
    pub fn swap_buffer(&self, buf: &mut ImageBuf) {
        let mut b = self.buffers.lock();
        std::mem::swap(&mut b.image, buf);
        b.mark();
    }

    /// Independent deep copy, including the pending-update state.
    pub fn duplicate(&self) -> Image {
        let b = self.buffers.lock();
        Image {
            buffers: Mutex::new(Buffers {
                image: b.image.clone(),
                staging: ImageBuf::default(),
                timestamp: b.timestamp,
                updated: b.updated,
            }),
        }
    }

    /// Whether a write happened since the last [`BufferObject::update`].
    pub fn is_updated(&self) -> bool {
        self.buffers.lock().updated
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Image {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}

impl From<ImageBuf> for Image {
    fn from(buf: ImageBuf) -> Self {
        Self {
            buffers: Mutex::new(Buffers::new(buf)),
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.buffers.lock();
        f.debug_struct("Image")
            .field("spec", &b.image.spec())
            .field("updated", &b.updated)
            .finish()
    }
}

impl BufferObject for Image {
    fn serialize(&self) -> SerializedObject {
        serial::encode(&self.buffers.lock().image)
    }

    fn deserialize(&self, obj: &SerializedObject) -> Result<(), ImageError> {
        let (spec, pixels) = serial::decode(obj)?;
        let mut b = self.buffers.lock();
        b.staging.assign_raw(spec, pixels);
        b.publish_staging();
        Ok(())
    }

    fn update(&self) -> bool {
        std::mem::take(&mut self.buffers.lock().updated)
    }

    fn timestamp(&self) -> Instant {
        self.buffers.lock().timestamp
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn end_to_end_u8_fill_and_round_trip() {
        let image = Image::new();
        image.set_empty(64, 64, 4, PixelFormat::U8).unwrap();
        image.set_to(255u8);

        let blob = image.serialize();
        assert_eq!(blob.len(), 16 + 64 * 64 * 4);

        let other = Image::new();
        other.deserialize(&blob).unwrap();
        let guard = other.lock();
        assert_eq!(guard.spec(), ImageSpec::new(64, 64, 4, PixelFormat::U8));
        assert!(guard.data().iter().all(|&b| b == 255));
    }

    #[test]
    fn round_trip_preserves_shape_and_bytes() {
        let shapes = [
            ImageSpec::new(3, 5, 1, PixelFormat::U8),
            ImageSpec::new(7, 2, 3, PixelFormat::U16),
            ImageSpec::new(4, 4, 4, PixelFormat::F32),
        ];
        for spec in shapes {
            let mut buf = ImageBuf::new(spec).unwrap();
            for (i, b) in buf.data_mut().iter_mut().enumerate() {
                *b = (i * 31 % 251) as u8;
            }
            let src = Image::from(buf.clone());
            let dst = Image::new();
            dst.deserialize(&src.serialize()).unwrap();
            assert_eq!(dst.get().data(), buf.data());
            assert_eq!(dst.spec(), spec);
        }
    }

    #[test]
    fn malformed_blob_leaves_image_unchanged() {
        let image = Image::from(ImageBuf::checkerboard(8, 2));
        assert!(image.update());
        let before = image.get();

        let mut bytes = image.serialize().into_bytes();
        bytes.pop();
        assert!(image.deserialize(&SerializedObject::from_bytes(bytes)).is_err());
        assert!(image.deserialize(&SerializedObject::from_bytes(vec![1, 2, 3])).is_err());

        assert_eq!(image.get(), before);
        assert!(!image.update(), "failed writes must not flag an update");
    }

    #[test]
    fn failed_read_keeps_prior_state() {
        let image = Image::with_default_pattern();
        let before = image.get();
        let err = image.read("/nonexistent/lumen/none.png").unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
        assert_eq!(image.get(), before);
    }

    #[test]
    fn update_consumes_flag() {
        let image = Image::new();
        assert!(image.update());
        assert!(!image.update());
        image.set_to(1u8);
        assert!(image.is_updated());
        assert!(image.update());
        assert!(!image.is_updated());
    }

    #[test]
    fn clone_is_independent() {
        let a = Image::new();
        a.set_empty(2, 2, 1, PixelFormat::U8).unwrap();
        let b = a.clone();
        a.set_to(200u8);
        assert!(b.get().data().iter().all(|&v| v == 0));
        assert!(a.get().data().iter().all(|&v| v == 200));
    }

    #[test]
    fn swap_buffer_exchanges_without_copy() {
        let image = Image::from(ImageBuf::checkerboard(4, 1));
        let mut other = ImageBuf::new(ImageSpec::new(1, 1, 1, PixelFormat::U8)).unwrap();
        let ptr = other.data().as_ptr();
        image.swap_buffer(&mut other);
        assert_eq!(image.lock().data().as_ptr(), ptr);
        assert_eq!(other.spec().width, 4);
    }

    #[test]
    fn readers_never_observe_torn_writes() {
        let image = Arc::new(Image::new());
        image.set_empty(32, 32, 4, PixelFormat::U8).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        std::thread::scope(|s| {
            let writer_image = Arc::clone(&image);
            let writer_stop = Arc::clone(&stop);
            s.spawn(move || {
                let mut v = 0u8;
                while !writer_stop.load(Ordering::Relaxed) {
                    v = v.wrapping_add(1);
                    writer_image.set_to(v);
                    let mut buf = ImageBuf::new(ImageSpec::new(32, 32, 4, PixelFormat::U8)).unwrap();
                    buf.fill(v);
                    writer_image.set(&buf);
                }
            });

            for _ in 0..2000 {
                let guard = image.lock();
                let data = guard.data();
                let first = data[0];
                assert!(data.iter().all(|&b| b == first), "torn read");
            }
            stop.store(true, Ordering::Relaxed);
        });
    }
}
