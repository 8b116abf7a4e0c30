/// Storage format of a [`Texture`](super::Texture).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    Depth32,
}

impl TextureFormat {
    pub const fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Depth32 => wgpu::TextureFormat::Depth32Float,
        }
    }

    pub const fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth32)
    }

    pub(crate) fn usage(self) -> wgpu::TextureUsages {
        match self {
            TextureFormat::Rgba8 => {
                wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC
            }
            TextureFormat::Depth32 => {
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
            }
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct TextureSpec {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub mipmapped: bool,
}

impl TextureSpec {
    /// Mipmapped RGBA8 color target.
    pub const fn color(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            mipmapped: true,
        }
    }

    pub const fn depth(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Depth32,
            mipmapped: false,
        }
    }

    pub const fn with_size(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Full chain down to 1x1 for mipmapped color textures, otherwise 1.
    pub fn mip_level_count(&self) -> u32 {
        if !self.mipmapped || self.format.is_depth() || self.is_empty() {
            return 1;
        }
        32 - self.width.max(self.height).leading_zeros()
    }

    /// Whether resizing to `width` x `height` reallocates.
    ///
    /// Unchanged sizes and zero dimensions never do.
    pub const fn needs_resize(&self, width: u32, height: u32) -> bool {
        width != 0 && height != 0 && (width != self.width || height != self.height)
    }

    pub(crate) fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_is_noop_for_same_or_zero_size() {
        let spec = TextureSpec::color(640, 480);
        assert!(!spec.needs_resize(640, 480));
        assert!(!spec.needs_resize(0, 480));
        assert!(!spec.needs_resize(640, 0));
        assert!(spec.needs_resize(800, 600));
        assert!(spec.needs_resize(640, 481));
    }

    #[test]
    fn mip_chain_reaches_one_pixel() {
        assert_eq!(TextureSpec::color(1, 1).mip_level_count(), 1);
        assert_eq!(TextureSpec::color(640, 480).mip_level_count(), 10);
        assert_eq!(TextureSpec::color(1024, 16).mip_level_count(), 11);
        assert_eq!(TextureSpec::depth(1024, 1024).mip_level_count(), 1);
    }
}
