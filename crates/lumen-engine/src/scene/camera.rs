use glam::{Mat4, Vec3};
use slotmap::SlotMap;

use crate::render::{RenderCtx, RenderError};
use crate::shader::ShaderProgram;
use crate::texture::{Texture, TextureSpec};

use super::value::{floats, Value};
use super::{CameraId, NodeHandle, Object, ObjectId, SceneImage, ImageId};

const MIN_DISTANCE: f32 = 0.01;
const MAX_PITCH: f32 = 1.55;

/// Geometry and images a camera draws from.
#[derive(Clone, Copy)]
pub struct DrawSources<'a> {
    pub objects: &'a SlotMap<ObjectId, Object>,
    pub images: &'a SlotMap<ImageId, SceneImage>,
}

/// An offscreen render target drawing linked objects through one program.
///
/// Color and depth targets are allocated on the first render and follow the
/// camera size. The color output is mipmapped so it can be sampled small.
pub struct Camera {
    name: String,
    objects: Vec<ObjectId>,
    tracked: Option<CameraId>,
    shader: ShaderProgram,
    color: Texture,
    depth: Texture,

    eye: Vec3,
    target: Vec3,
    up: Vec3,
    fov_y: f32,
    near: f32,
    far: f32,
    width: u32,
    height: u32,
}

impl Camera {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        let name = name.into();
        Self {
            objects: Vec::new(),
            tracked: None,
            shader: ShaderProgram::new(format!("{name} program")),
            color: Texture::new(format!("{name} color"), TextureSpec::color(width, height)),
            depth: Texture::new(format!("{name} depth"), TextureSpec::depth(width, height)),
            eye: Vec3::new(2.0, 2.0, 0.0),
            target: Vec3::new(0.0, 0.0, 0.5),
            up: Vec3::Z,
            fov_y: 35.0,
            near: 0.01,
            far: 1000.0,
            width,
            height,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Takes effect on the next render.
    pub fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn fov(&self) -> f32 {
        self.fov_y
    }

    pub fn look_at(&mut self, eye: Vec3, target: Vec3) {
        self.eye = eye;
        self.target = target;
    }

    pub fn set_fov(&mut self, degrees: f32) {
        self.fov_y = degrees.clamp(1.0, 179.0);
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    pub fn shader_mut(&mut self) -> &mut ShaderProgram {
        &mut self.shader
    }

    /// Color output, sampled by later stages.
    pub fn output(&self) -> &Texture {
        &self.color
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn tracked(&self) -> Option<CameraId> {
        self.tracked
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let aspect = self.width.max(1) as f32 / self.height.max(1) as f32;
        Mat4::perspective_rh(self.fov_y.to_radians(), aspect, self.near, self.far)
    }

    /// Links a camera (tracked sub-camera) or an object (draw list).
    ///
    /// Returns `false` for any other kind. Linking the same object twice is a no-op.
    pub fn link_to(&mut self, target: NodeHandle) -> bool {
        match target {
            NodeHandle::Camera(id) => {
                self.tracked = Some(id);
                true
            }
            NodeHandle::Object(id) => {
                if !self.objects.contains(&id) {
                    self.objects.push(id);
                }
                true
            }
            NodeHandle::Image(_) => false,
        }
    }

    pub fn unlink(&mut self, target: NodeHandle) -> bool {
        match target {
            NodeHandle::Camera(id) if self.tracked == Some(id) => {
                self.tracked = None;
                true
            }
            NodeHandle::Object(id) => {
                let before = self.objects.len();
                self.objects.retain(|&o| o != id);
                before != self.objects.len()
            }
            _ => false,
        }
    }

    /// Rotates the eye around the target: `yaw` about the up axis, `pitch`
    /// towards it (radians). Pitch stops short of the poles.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.eye - self.target;
        let distance = offset.length();
        if distance < f32::EPSILON {
            return;
        }

        let up = self.up.normalize();
        let current_pitch = (offset.dot(up) / distance).clamp(-1.0, 1.0).asin();
        let new_pitch = (current_pitch + pitch).clamp(-MAX_PITCH, MAX_PITCH);

        let flat = offset - up * offset.dot(up);
        let flat = if flat.length_squared() > f32::EPSILON {
            flat.normalize()
        } else {
            up.any_orthonormal_vector()
        };
        let flat = glam::Quat::from_axis_angle(up, yaw) * flat;

        self.eye = self.target + (flat * new_pitch.cos() + up * new_pitch.sin()) * distance;
    }

    /// Scales the eye-target distance by `factor` (`< 1` moves closer).
    pub fn dolly(&mut self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let offset = (self.eye - self.target) * factor;
        let offset = if offset.length() < MIN_DISTANCE {
            offset.normalize_or(Vec3::X) * MIN_DISTANCE
        } else {
            offset
        };
        self.eye = self.target + offset;
    }

    /// Sets `eye`, `target` (3 numbers), `size` (2) or `fov` (1).
    pub fn set_attribute(&mut self, name: &str, values: &[Value]) -> bool {
        match name {
            "eye" => floats::<3>(values).map(|[x, y, z]| self.eye = Vec3::new(x, y, z)).is_some(),
            "target" => floats::<3>(values)
                .map(|[x, y, z]| self.target = Vec3::new(x, y, z))
                .is_some(),
            "size" => match (values.first().and_then(Value::as_u32), values.get(1).and_then(Value::as_u32)) {
                (Some(w), Some(h)) if w > 0 && h > 0 => {
                    self.set_size(w, h);
                    true
                }
                _ => false,
            },
            "fov" => floats::<1>(values).map(|[f]| self.set_fov(f)).is_some(),
            _ => false,
        }
    }

    /// Draws every linked object into the color target and rebuilds its mips.
    ///
    /// Stale object or image handles are skipped. Errors reported by the
    /// device during the pass are returned after the pass is closed.
    pub fn render(&mut self, ctx: &RenderCtx, sources: DrawSources<'_>) -> Result<(), RenderError> {
        self.color.resize(ctx, self.width, self.height);
        self.depth.resize(ctx, self.width, self.height);
        let (Some(color_view), Some(depth_view)) = (self.color.target_view(), self.depth.target_view()) else {
            return Ok(());
        };
        // Views are cheap handles; cloning frees `self` for the shader calls below.
        let (color_view, depth_view) = (color_view.clone(), depth_view.clone());

        self.shader.activate(ctx)?;

        let view = self.view_matrix();
        let view_projection = self.projection_matrix() * view;

        let mut encoder = ctx.create_encoder("lumen camera encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&self.name),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for id in &self.objects {
                let Some(object) = sources.objects.get(*id).filter(|o| o.is_ready()) else {
                    continue;
                };

                let model = object.model();
                self.shader.set_view_projection_matrix(view_projection * model);
                self.shader
                    .set_normal_matrix((view * model).inverse().transpose());
                self.shader.set_sideness(object.sideness());
                for (unit, image) in object.textures().iter().enumerate() {
                    if let Some(image) = sources.images.get(*image) {
                        self.shader.set_texture(image.texture(), unit, &format!("_tex{unit}"));
                    }
                }

                let bound = self.shader.bind(ctx, &mut pass);
                self.shader.deactivate();
                bound?;
                object.draw(&mut pass);
            }
        }

        self.color.generate_mipmap_in(ctx, &mut encoder);
        ctx.submit(encoder);
        ctx.check_errors("camera render")
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("name", &self.name)
            .field("size", &(self.width, self.height))
            .field("objects", &self.objects)
            .field("tracked", &self.tracked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (SlotMap<CameraId, ()>, SlotMap<ObjectId, ()>, SlotMap<ImageId, ()>) {
        (SlotMap::with_key(), SlotMap::with_key(), SlotMap::with_key())
    }

    #[test]
    fn link_to_dispatches_on_kind() {
        let (mut cams, mut objs, mut imgs) = ids();
        let (c, o, i) = (cams.insert(()), objs.insert(()), imgs.insert(()));
        let mut cam = Camera::new("cam", 64, 64);

        assert!(cam.link_to(NodeHandle::Object(o)));
        assert!(cam.link_to(NodeHandle::Object(o)));
        assert_eq!(cam.objects(), &[o]);

        assert!(cam.link_to(NodeHandle::Camera(c)));
        assert_eq!(cam.tracked(), Some(c));

        assert!(!cam.link_to(NodeHandle::Image(i)));
        assert_eq!(cam.objects(), &[o]);
        assert_eq!(cam.tracked(), Some(c));
    }

    #[test]
    fn unlink_removes_links() {
        let (mut cams, mut objs, _) = ids();
        let (c, o) = (cams.insert(()), objs.insert(()));
        let mut cam = Camera::new("cam", 64, 64);
        cam.link_to(NodeHandle::Object(o));
        cam.link_to(NodeHandle::Camera(c));

        assert!(cam.unlink(NodeHandle::Object(o)));
        assert!(!cam.unlink(NodeHandle::Object(o)));
        assert!(cam.unlink(NodeHandle::Camera(c)));
        assert_eq!(cam.tracked(), None);
    }

    #[test]
    fn orbit_keeps_distance_to_target() {
        let mut cam = Camera::new("cam", 64, 64);
        let d0 = cam.eye().distance(cam.target());
        cam.orbit(0.7, 0.3);
        cam.orbit(-2.0, 5.0);
        assert!((cam.eye().distance(cam.target()) - d0).abs() < 1e-4);
    }

    #[test]
    fn dolly_scales_distance() {
        let mut cam = Camera::new("cam", 64, 64);
        cam.look_at(Vec3::new(0.0, 4.0, 0.0), Vec3::ZERO);
        cam.dolly(0.5);
        assert!((cam.eye() - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
        cam.dolly(0.0);
        assert!((cam.eye() - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
        cam.dolly(1e-9);
        assert!((cam.eye().length() - MIN_DISTANCE).abs() < 1e-5);
    }

    #[test]
    fn attributes() {
        let mut cam = Camera::new("cam", 64, 64);
        assert!(cam.set_attribute("size", &[Value::from(800), Value::from(600)]));
        assert_eq!(cam.size(), (800, 600));
        assert!(!cam.set_attribute("size", &[Value::from(0), Value::from(600)]));
        assert!(cam.set_attribute("eye", &[1.0.into(), 2.0.into(), 3.0.into()]));
        assert_eq!(cam.eye(), Vec3::new(1.0, 2.0, 3.0));
        assert!(!cam.set_attribute("eye", &[1.0.into()]));
        assert!(!cam.set_attribute("blend", &[]));
    }
}
