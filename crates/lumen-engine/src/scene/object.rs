use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::render::RenderCtx;
use crate::shader::{Sideness, Vertex};

use super::ImageId;

/// Drawable geometry with the images projected onto it.
pub struct Object {
    name: String,
    vertices: Vec<Vertex>,
    model: Mat4,
    sideness: Sideness,
    textures: Vec<ImageId>,

    vbo: Option<wgpu::Buffer>,
    dirty: bool,
}

impl Object {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            model: Mat4::IDENTITY,
            sideness: Sideness::default(),
            textures: Vec::new(),
            vbo: None,
            dirty: true,
        }
    }

    /// `width` x `height` rectangle in the XY plane, centered on the origin,
    /// facing +Z, with texture `v` running top to bottom.
    pub fn plane(name: impl Into<String>, width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let n = [0.0, 0.0, 1.0];
        let tl = Vertex::new([-hw, hh, 0.0], [0.0, 0.0], n);
        let tr = Vertex::new([hw, hh, 0.0], [1.0, 0.0], n);
        let br = Vertex::new([hw, -hh, 0.0], [1.0, 1.0], n);
        let bl = Vertex::new([-hw, -hh, 0.0], [0.0, 1.0], n);

        let mut obj = Self::new(name);
        obj.set_vertices(vec![tl, bl, br, tl, br, tr]);
        obj
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Replaces the triangle list.
    pub fn set_vertices(&mut self, vertices: Vec<Vertex>) {
        self.vertices = vertices;
        self.dirty = true;
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn set_model(&mut self, model: Mat4) {
        self.model = model;
    }

    pub fn sideness(&self) -> Sideness {
        self.sideness
    }

    pub fn set_sideness(&mut self, sideness: Sideness) {
        self.sideness = sideness;
    }

    pub fn textures(&self) -> &[ImageId] {
        &self.textures
    }

    /// Adds an image layer. Returns `false` if it was already linked.
    pub fn link_texture(&mut self, image: ImageId) -> bool {
        if self.textures.contains(&image) {
            return false;
        }
        self.textures.push(image);
        true
    }

    pub fn unlink_texture(&mut self, image: ImageId) -> bool {
        let before = self.textures.len();
        self.textures.retain(|&t| t != image);
        self.textures.len() != before
    }

    /// Uploads the vertex buffer if the geometry changed.
    pub fn prepare(&mut self, ctx: &RenderCtx) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.vbo = (!self.vertices.is_empty()).then(|| {
            ctx.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&self.name),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
    }

    /// Whether [`draw`](Self::draw) has anything to record.
    pub fn is_ready(&self) -> bool {
        self.vbo.is_some()
    }

    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(vbo) = &self.vbo else { return };
        pass.set_vertex_buffer(0, vbo.slice(..));
        pass.draw(0..self.vertices.len() as u32, 0..1);
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("vertices", &self.vertices.len())
            .field("textures", &self.textures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    #[test]
    fn plane_faces_positive_z() {
        let p = Object::plane("screen", 2.0, 1.0);
        assert_eq!(p.vertices().len(), 6);
        assert!(p.vertices().iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert!(p.vertices().iter().all(|v| v.position[0].abs() == 1.0));
    }

    #[test]
    fn texture_links_are_unique() {
        let mut ids: SlotMap<ImageId, ()> = SlotMap::with_key();
        let a = ids.insert(());
        let mut obj = Object::new("o");
        assert!(obj.link_texture(a));
        assert!(!obj.link_texture(a));
        assert!(obj.unlink_texture(a));
        assert!(obj.textures().is_empty());
    }
}
