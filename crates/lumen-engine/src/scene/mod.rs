//! Scene graph: cameras, drawable objects and images in arenas.
//!
//! The scene owns every node. Everything else (cameras linking objects, the
//! overlay previewing a camera) holds [`NodeHandle`]s, which go stale rather
//! than dangle when a node is removed.

mod camera;
mod image;
mod object;
mod value;

use std::collections::HashSet;
use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

use crate::image::Image;
use crate::render::{RenderCtx, RenderError};

pub use camera::{Camera, DrawSources};
pub use self::image::SceneImage;
pub use object::Object;
pub use value::Value;

new_key_type! {
    pub struct CameraId;
    pub struct ObjectId;
    pub struct ImageId;
}

/// Non-owning reference to any scene node, tagged with its kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeHandle {
    Camera(CameraId),
    Object(ObjectId),
    Image(ImageId),
}

impl From<CameraId> for NodeHandle {
    fn from(id: CameraId) -> Self {
        NodeHandle::Camera(id)
    }
}

impl From<ObjectId> for NodeHandle {
    fn from(id: ObjectId) -> Self {
        NodeHandle::Object(id)
    }
}

impl From<ImageId> for NodeHandle {
    fn from(id: ImageId) -> Self {
        NodeHandle::Image(id)
    }
}

/// Requests raised from inside the frame (usually by the overlay) and handled
/// by the application between frames.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SceneMessage {
    Quit,
    Save,
}

#[derive(Debug, Default)]
pub struct Scene {
    cameras: SlotMap<CameraId, Camera>,
    objects: SlotMap<ObjectId, Object>,
    images: SlotMap<ImageId, SceneImage>,
    messages: Vec<SceneMessage>,
    blending_generation: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_camera(&mut self, camera: Camera) -> CameraId {
        self.cameras.insert(camera)
    }

    pub fn add_object(&mut self, object: Object) -> ObjectId {
        self.objects.insert(object)
    }

    pub fn add_image(&mut self, name: impl Into<String>, image: Arc<Image>) -> ImageId {
        self.images.insert(SceneImage::new(name, image))
    }

    pub fn camera(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.get(id)
    }

    pub fn camera_mut(&mut self, id: CameraId) -> Option<&mut Camera> {
        self.cameras.get_mut(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    pub fn image(&self, id: ImageId) -> Option<&SceneImage> {
        self.images.get(id)
    }

    pub fn cameras(&self) -> impl Iterator<Item = (CameraId, &Camera)> {
        self.cameras.iter()
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter()
    }

    pub fn images(&self) -> impl Iterator<Item = (ImageId, &SceneImage)> {
        self.images.iter()
    }

    pub fn find_camera(&self, name: &str) -> Option<CameraId> {
        self.cameras.iter().find(|(_, c)| c.name() == name).map(|(id, _)| id)
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        match handle {
            NodeHandle::Camera(id) => self.cameras.contains_key(id),
            NodeHandle::Object(id) => self.objects.contains_key(id),
            NodeHandle::Image(id) => self.images.contains_key(id),
        }
    }

    /// Links `target` to `camera`. Fails for missing nodes, self links and
    /// kinds a camera cannot link.
    pub fn link(&mut self, camera: CameraId, target: NodeHandle) -> bool {
        if !self.contains(target) || target == NodeHandle::Camera(camera) {
            return false;
        }
        self.cameras
            .get_mut(camera)
            .is_some_and(|c| c.link_to(target))
    }

    /// Projects `image` onto `object`.
    pub fn link_texture(&mut self, object: ObjectId, image: ImageId) -> bool {
        if !self.images.contains_key(image) {
            return false;
        }
        self.objects
            .get_mut(object)
            .is_some_and(|o| o.link_texture(image))
    }

    pub fn remove_camera(&mut self, id: CameraId) -> Option<Camera> {
        let removed = self.cameras.remove(id)?;
        for cam in self.cameras.values_mut() {
            cam.unlink(NodeHandle::Camera(id));
        }
        Some(removed)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        let removed = self.objects.remove(id)?;
        for cam in self.cameras.values_mut() {
            cam.unlink(NodeHandle::Object(id));
        }
        Some(removed)
    }

    pub fn remove_image(&mut self, id: ImageId) -> Option<SceneImage> {
        let removed = self.images.remove(id)?;
        for obj in self.objects.values_mut() {
            obj.unlink_texture(id);
        }
        Some(removed)
    }

    pub fn post(&mut self, message: SceneMessage) {
        log::debug!("scene message {message:?}");
        self.messages.push(message);
    }

    pub fn drain_messages(&mut self) -> Vec<SceneMessage> {
        std::mem::take(&mut self.messages)
    }

    /// Asks the blending stage to recompute its maps.
    pub fn compute_blending_map(&mut self) {
        self.blending_generation += 1;
        log::info!("blending map recomputation requested");
    }

    /// Incremented on every [`compute_blending_map`](Self::compute_blending_map).
    pub fn blending_generation(&self) -> u64 {
        self.blending_generation
    }

    /// Uploads images with pending content. Returns how many were uploaded.
    pub fn upload_images(&mut self, ctx: &RenderCtx) -> usize {
        let mut uploaded = 0;
        for image in self.images.values_mut() {
            match image.upload(ctx) {
                Ok(true) => uploaded += 1,
                Ok(false) => {}
                Err(e) => log::warn!("image '{}' upload failed: {e}", image.name()),
            }
        }
        uploaded
    }

    /// Creates or refreshes GPU geometry for every object.
    pub fn prepare_objects(&mut self, ctx: &RenderCtx) {
        for object in self.objects.values_mut() {
            object.prepare(ctx);
        }
    }

    /// Borrows the cameras mutably next to the draw sources.
    pub fn split(&mut self) -> (&mut SlotMap<CameraId, Camera>, DrawSources<'_>) {
        (
            &mut self.cameras,
            DrawSources {
                objects: &self.objects,
                images: &self.images,
            },
        )
    }

    pub fn sources(&self) -> DrawSources<'_> {
        DrawSources {
            objects: &self.objects,
            images: &self.images,
        }
    }

    /// Renders every camera, tracked sub-cameras before the cameras tracking
    /// them. A failing camera is logged and skipped; the last error is returned.
    pub fn render_cameras(&mut self, ctx: &RenderCtx) -> Result<(), RenderError> {
        let order = self.render_order();
        let (cameras, sources) = self.split();

        let mut result = Ok(());
        for id in order {
            let Some(camera) = cameras.get_mut(id) else { continue };
            if let Err(e) = camera.render(ctx, sources) {
                log::warn!("camera '{}': {e}", camera.name());
                result = Err(e);
            }
        }
        result
    }

    /// Camera ids with tracked cameras first. Cycles are broken arbitrarily.
    pub fn render_order(&self) -> Vec<CameraId> {
        fn visit(
            id: CameraId,
            cameras: &SlotMap<CameraId, Camera>,
            seen: &mut HashSet<CameraId>,
            out: &mut Vec<CameraId>,
        ) {
            if !seen.insert(id) {
                return;
            }
            if let Some(tracked) = cameras.get(id).and_then(Camera::tracked) {
                visit(tracked, cameras, seen, out);
            }
            if cameras.contains_key(id) {
                out.push(id);
            }
        }

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(self.cameras.len());
        for id in self.cameras.keys() {
            visit(id, &self.cameras, &mut seen, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_validates_targets() {
        let mut scene = Scene::new();
        let cam = scene.add_camera(Camera::new("a", 32, 32));
        let obj = scene.add_object(Object::plane("o", 1.0, 1.0));
        let img = scene.add_image("i", Arc::new(Image::new()));

        assert!(scene.link(cam, obj.into()));
        assert!(!scene.link(cam, img.into()));
        assert!(!scene.link(cam, cam.into()));

        scene.remove_object(obj);
        assert!(!scene.link(cam, obj.into()));
        assert!(scene.camera(cam).is_some_and(|c| c.objects().is_empty()));
    }

    #[test]
    fn removing_image_unlinks_textures() {
        let mut scene = Scene::new();
        let obj = scene.add_object(Object::plane("o", 1.0, 1.0));
        let img = scene.add_image("i", Arc::new(Image::new()));
        assert!(scene.link_texture(obj, img));
        scene.remove_image(img);
        assert!(scene.object(obj).is_some_and(|o| o.textures().is_empty()));
    }

    #[test]
    fn tracked_cameras_render_first() {
        let mut scene = Scene::new();
        let outer = scene.add_camera(Camera::new("outer", 32, 32));
        let inner = scene.add_camera(Camera::new("inner", 32, 32));
        assert!(scene.link(outer, inner.into()));

        let order = scene.render_order();
        let pos = |id| order.iter().position(|&c| c == id);
        assert!(pos(inner) < pos(outer));
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn tracking_cycles_terminate() {
        let mut scene = Scene::new();
        let a = scene.add_camera(Camera::new("a", 32, 32));
        let b = scene.add_camera(Camera::new("b", 32, 32));
        scene.link(a, b.into());
        scene.link(b, a.into());
        assert_eq!(scene.render_order().len(), 2);
    }

    #[test]
    fn messages_and_blending() {
        let mut scene = Scene::new();
        scene.post(SceneMessage::Save);
        scene.post(SceneMessage::Quit);
        assert_eq!(scene.drain_messages(), [SceneMessage::Save, SceneMessage::Quit]);
        assert!(scene.drain_messages().is_empty());

        scene.compute_blending_map();
        assert_eq!(scene.blending_generation(), 1);
    }
}
