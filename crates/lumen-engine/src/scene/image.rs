use std::sync::Arc;

use crate::image::{BufferObject, Image};
use crate::render::{RenderCtx, RenderError};
use crate::texture::{Texture, TextureSpec};

/// A shared pixel buffer and the texture it feeds.
///
/// Producers keep clones of the `Arc<Image>` and write from any thread; the
/// render thread calls [`SceneImage::upload`] once per frame.
pub struct SceneImage {
    name: String,
    image: Arc<Image>,
    texture: Texture,
}

impl SceneImage {
    pub fn new(name: impl Into<String>, image: Arc<Image>) -> Self {
        let name = name.into();
        Self {
            texture: Texture::new(format!("{name} texture"), TextureSpec::color(0, 0)),
            name,
            image,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Uploads when the image published new content. Returns whether it did.
    pub fn upload(&mut self, ctx: &RenderCtx) -> Result<bool, RenderError> {
        if !self.image.update() {
            return Ok(false);
        }
        self.texture.upload(ctx, &self.image)?;
        Ok(true)
    }
}

impl std::fmt::Debug for SceneImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneImage")
            .field("name", &self.name)
            .field("image", &self.image)
            .field("texture", &self.texture)
            .finish()
    }
}
