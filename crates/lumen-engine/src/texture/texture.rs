use std::sync::atomic::{AtomicU64, Ordering};

use crate::image::Image;
use crate::render::{RenderCtx, RenderError};

use super::{TextureFormat, TextureSpec};

/// Identity of one GPU allocation. A texture gets a new id whenever its
/// storage is reallocated, so cached bind groups can detect staleness.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

struct Allocation {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    /// Level 0 only, for render attachments.
    target_view: wgpu::TextureView,
}

/// A GPU-resident 2D image.
///
/// Mutating operations take the [`RenderCtx`] and run on the render thread;
/// `spec` and `id` are plain metadata.
pub struct Texture {
    label: String,
    spec: TextureSpec,
    id: TextureId,
    alloc: Option<Allocation>,
}

impl Texture {
    /// Creates an unallocated texture; storage appears on the first
    /// [`reset`](Self::reset), [`resize`](Self::resize) or [`upload`](Self::upload).
    pub fn new(label: impl Into<String>, spec: TextureSpec) -> Self {
        Self {
            label: label.into(),
            spec,
            id: TextureId::next(),
            alloc: None,
        }
    }

    #[inline]
    pub fn spec(&self) -> TextureSpec {
        self.spec
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_allocated(&self) -> bool {
        self.alloc.is_some()
    }

    /// View over every mip level.
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.alloc.as_ref().map(|a| &a.view)
    }

    /// View over level 0, usable as a render pass attachment.
    pub fn target_view(&self) -> Option<&wgpu::TextureView> {
        self.alloc.as_ref().map(|a| &a.target_view)
    }

    pub fn raw(&self) -> Option<&wgpu::Texture> {
        self.alloc.as_ref().map(|a| &a.texture)
    }

    /// (Re)allocates storage for `spec`, discarding previous contents.
    ///
    /// `initial` fills level 0 of a color texture when its length matches.
    /// Sizes beyond the device limit are rejected and the previous storage kept.
    pub fn reset(
        &mut self,
        ctx: &RenderCtx,
        spec: TextureSpec,
        initial: Option<&[u8]>,
    ) -> Result<(), RenderError> {
        let limit = ctx.max_texture_dimension();
        if spec.width > limit || spec.height > limit {
            log::warn!(
                "texture '{}': {}x{} exceeds device limit {limit}, keeping previous storage",
                self.label,
                spec.width,
                spec.height
            );
            return Err(RenderError::TextureTooLarge {
                width: spec.width,
                height: spec.height,
                limit,
            });
        }

        self.spec = spec;
        self.id = TextureId::next();
        if spec.is_empty() {
            self.alloc = None;
            return Ok(());
        }

        let texture = ctx.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label),
            size: spec.extent(),
            mip_level_count: spec.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: spec.format.to_wgpu(),
            usage: spec.format.usage(),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let target_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("target view"),
            mip_level_count: Some(1),
            ..Default::default()
        });
        log::debug!(
            "texture '{}' allocated {}x{} {:?}",
            self.label,
            spec.width,
            spec.height,
            spec.format
        );

        self.alloc = Some(Allocation {
            texture,
            view,
            target_view,
        });

        if let Some(data) = initial {
            if spec.format == TextureFormat::Rgba8 && data.len() == rgba_len(&spec) {
                self.write_level0(ctx, data);
            } else {
                log::warn!(
                    "texture '{}': ignoring {} initial bytes for {}x{} {:?}",
                    self.label,
                    data.len(),
                    spec.width,
                    spec.height,
                    spec.format
                );
            }
        }
        Ok(())
    }

    /// Reallocates with the same format. Returns `false` without touching the
    /// GPU when the size is unchanged or has a zero dimension.
    pub fn resize(&mut self, ctx: &RenderCtx, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if self.is_allocated() && !self.spec.needs_resize(width, height) {
            return false;
        }
        self.reset(ctx, self.spec.with_size(width, height), None).is_ok()
    }

    /// Copies the current contents of `image` into the texture.
    ///
    /// The image lock is held only while converting to RGBA8 on the CPU.
    /// Storage follows the image shape; empty images are skipped.
    pub fn upload(&mut self, ctx: &RenderCtx, image: &Image) -> Result<(), RenderError> {
        let (width, height, pixels) = {
            let guard = image.lock();
            let spec = guard.spec();
            (spec.width, spec.height, guard.buffer().to_rgba8().into_owned())
        };
        if width == 0 || height == 0 {
            return Ok(());
        }

        if self.spec.format != TextureFormat::Rgba8 {
            self.spec.format = TextureFormat::Rgba8;
            self.alloc = None;
        }
        if !self.is_allocated() || self.spec.needs_resize(width, height) {
            self.reset(ctx, self.spec.with_size(width, height), None)?;
        }

        self.write_level0(ctx, &pixels);
        if self.spec.mipmapped {
            self.generate_mipmap(ctx);
        }
        Ok(())
    }

    /// Rebuilds mip levels from level 0.
    pub fn generate_mipmap(&self, ctx: &RenderCtx) {
        if self.spec.mip_level_count() < 2 {
            return;
        }
        let mut encoder = ctx.create_encoder("lumen mipmap encoder");
        self.generate_mipmap_in(ctx, &mut encoder);
        ctx.submit(encoder);
    }

    /// Like [`generate_mipmap`](Self::generate_mipmap) but records into an existing encoder.
    pub fn generate_mipmap_in(&self, ctx: &RenderCtx, encoder: &mut wgpu::CommandEncoder) {
        if let Some(a) = &self.alloc {
            ctx.blitter().generate_mipmaps(ctx.device(), encoder, &a.texture);
        }
    }

    fn write_level0(&self, ctx: &RenderCtx, rgba: &[u8]) {
        let Some(a) = &self.alloc else { return };
        ctx.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &a.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.spec.width),
                rows_per_image: Some(self.spec.height),
            },
            self.spec.extent(),
        );
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.label)
            .field("spec", &self.spec)
            .field("id", &self.id)
            .field("allocated", &self.is_allocated())
            .finish()
    }
}

fn rgba_len(spec: &TextureSpec) -> usize {
    spec.width as usize * spec.height as usize * 4
}
