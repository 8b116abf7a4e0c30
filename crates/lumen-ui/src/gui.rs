use std::sync::Arc;

use lumen_engine::input::{InputEvent, Key, KeyAction, Modifiers};
use lumen_engine::logging::LogSink;
use lumen_engine::render::{RenderCtx, RenderError};
use lumen_engine::scene::{Camera, CameraId, NodeHandle, Scene, SceneMessage, Value};
use lumen_engine::text::{FontError, FontId, FontSystem};
use lumen_engine::texture::{Texture, TextureSpec};
use lumen_engine::time::Timer;

use crate::draw::DrawList;
use crate::event::PointerTracker;
use crate::layout::OverlayLayout;
use crate::painter::Painter;
use crate::render::OverlayRenderer;
use crate::style::Style;
use crate::widget::{FrameInfo, PreviewImage, Widget};
use crate::widgets::{CameraView, GraphView, HelpView, LogView, Navigation, ProfileView};

/// Nominal frame time handed to the widgets.
const WIDGET_DT: f32 = 0.016;
const DEFAULT_SIZE: (u32, u32) = (640, 480);

/// Operator overlay: an offscreen, mipmapped RGBA target the world loop lays
/// over the camera outputs.
///
/// The overlay tracks a size (set through [`set_output_size`](Self::set_output_size)
/// or the `size` attribute); the next [`render`](Self::render) resizes the
/// targets, clamped to the device texture limit, and relayouts the widgets
/// before drawing. After a render, [`size`](Self::size) is the allocated size.
pub struct Gui {
    name: String,
    width: u32,
    height: u32,
    color: Texture,
    depth: Texture,
    visible: bool,

    layout: OverlayLayout,
    help: HelpView,
    profile: ProfileView,
    log: LogView,
    graph: GraphView,
    camera_view: CameraView,

    /// Camera shown in the preview when no scene camera is linked.
    nav: Camera,
    preview: Option<CameraId>,

    logs: LogSink,
    timer: Arc<Timer>,
    fonts: FontSystem,
    font: Option<FontId>,
    style: Style,

    list: DrawList,
    renderer: Option<OverlayRenderer>,
    pointer: PointerTracker,
}

impl Gui {
    pub fn new(name: impl Into<String>, logs: LogSink, timer: Arc<Timer>) -> Self {
        let name = name.into();
        let (width, height) = DEFAULT_SIZE;
        let mut gui = Self {
            color: Texture::new(format!("{name} color"), TextureSpec::color(width, height)),
            depth: Texture::new(format!("{name} depth"), TextureSpec::depth(width, height)),
            name,
            width,
            height,
            visible: true,
            layout: OverlayLayout::compute(width as f32, height as f32),
            help: HelpView::new(),
            profile: ProfileView::new(),
            log: LogView::new(),
            graph: GraphView::new(),
            camera_view: CameraView::new(),
            nav: Camera::new("guiCamera", width, height),
            preview: None,
            logs,
            timer,
            fonts: FontSystem::new(),
            font: None,
            style: Style::default(),
            list: DrawList::new(),
            renderer: None,
            pointer: PointerTracker::new(),
        };
        gui.relayout();
        gui
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Color output, premultiplied alpha. Unallocated until the first render.
    pub fn output(&self) -> &Texture {
        &self.color
    }

    pub fn preview(&self) -> Option<CameraId> {
        self.preview
    }

    pub fn navigation_camera(&self) -> &Camera {
        &self.nav
    }

    /// Loads a font and makes it the overlay font if none is set yet.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontError> {
        let id = self.fonts.load_font(bytes)?;
        self.font.get_or_insert(id);
        Ok(id)
    }

    pub fn set_font(&mut self, font: FontId) {
        if self.fonts.get(font).is_some() {
            self.font = Some(font);
        }
    }

    /// Ratio between physical overlay pixels and logical input positions.
    pub fn set_pointer_scale(&mut self, scale: f32) {
        self.pointer.set_scale(scale);
    }

    /// Tracks a new output size; the targets follow on the next render.
    pub fn set_output_size(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    /// Only `size` (two positive integers) is understood.
    pub fn set_attribute(&mut self, name: &str, values: &[Value]) -> bool {
        match (name, values) {
            ("size", [w, h]) => match (w.as_u32(), h.as_u32()) {
                (Some(w), Some(h)) => self.set_output_size(w, h),
                _ => false,
            },
            _ => false,
        }
    }

    /// Camera: shown in the preview. Object: drawn by the navigation camera.
    /// Anything else, or a node missing from `scene`, is refused.
    pub fn link_to(&mut self, target: NodeHandle, scene: &Scene) -> bool {
        if !scene.contains(target) {
            return false;
        }
        match target {
            NodeHandle::Camera(id) => {
                self.preview = Some(id);
                true
            }
            NodeHandle::Object(_) => self.nav.link_to(target),
            NodeHandle::Image(_) => false,
        }
    }

    /// Applies reserved keys, then offers the event to the widgets.
    /// Returns whether the overlay used it.
    pub fn handle_event(&mut self, event: &InputEvent, scene: &mut Scene) -> bool {
        if let InputEvent::Key {
            key,
            action,
            modifiers,
        } = *event
        {
            let pressed = action == KeyAction::Press;
            match key {
                Key::Tab if pressed => {
                    self.visible = !self.visible;
                    self.timer.set_enabled(self.visible);
                    return true;
                }
                Key::Escape => {
                    scene.post(SceneMessage::Quit);
                    return true;
                }
                Key::B if pressed => {
                    scene.compute_blending_map();
                    return true;
                }
                Key::S if pressed && modifiers == Modifiers::CTRL => {
                    scene.post(SceneMessage::Save);
                    return true;
                }
                _ => {}
            }
        }

        let Some(ui_event) = self.pointer.translate(event) else {
            return false;
        };
        if !self.visible {
            return false;
        }
        self.widgets_mut()
            .into_iter()
            .any(|w| w.on_event(&ui_event).is_consumed())
    }

    /// Runs one overlay cycle: resize, preview camera, widgets, mipmaps.
    pub fn render(&mut self, ctx: &RenderCtx, scene: &mut Scene) -> Result<(), RenderError> {
        let limit = ctx.max_texture_dimension();
        let wanted = (self.width.min(limit), self.height.min(limit));
        let spec = self.color.spec();
        let resize = !self.color.is_allocated() || (spec.width, spec.height) != wanted;
        if resize {
            if wanted != (self.width, self.height) {
                log::warn!(
                    "gui '{}': {}x{} exceeds the device limit {limit}, drawing at {}x{}",
                    self.name,
                    self.width,
                    self.height,
                    wanted.0,
                    wanted.1
                );
            }
            self.color.resize(ctx, wanted.0, wanted.1);
            self.depth.resize(ctx, wanted.0, wanted.1);
            log::debug!("gui '{}' resized to {}x{}", self.name, wanted.0, wanted.1);
        }
        // Viewport and layout follow the storage actually allocated.
        self.sync_size();
        if resize {
            self.relayout();
        }
        let (Some(color_view), Some(depth_view)) = (self.color.target_view(), self.depth.target_view()) else {
            return Ok(());
        };
        let (color_view, depth_view) = (color_view.clone(), depth_view.clone());

        let preview = if self.visible {
            self.render_preview(ctx, scene)
        } else {
            None
        };

        self.list.clear();
        if self.visible {
            let frame = FrameInfo {
                dt: WIDGET_DT,
                logs: &self.logs,
                timer: &self.timer,
                preview: preview.as_ref().map(|(view, (width, height))| PreviewImage {
                    view,
                    width: *width,
                    height: *height,
                }),
            };
            let mut painter = Painter::new(&mut self.list, &self.fonts, self.font, self.style);
            self.help.paint(&mut painter, &frame);
            self.profile.paint(&mut painter, &frame);
            self.log.paint(&mut painter, &frame);
            self.graph.paint(&mut painter, &frame);
            self.camera_view.paint(&mut painter, &frame);
        }

        let renderer = self.renderer.get_or_insert_with(|| OverlayRenderer::new(ctx));
        renderer.prepare(ctx, &self.list, &self.fonts, self.font, (self.width, self.height));

        let mut encoder = ctx.create_encoder("lumen gui encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen gui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
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
            pass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
            renderer.draw(&mut pass);
        }
        self.color.generate_mipmap_in(ctx, &mut encoder);
        ctx.submit(encoder);

        ctx.check_errors("gui").inspect_err(|e| {
            log::warn!("gui '{}': {e}", self.name);
        })
    }

    /// Renders the previewed camera at its own size, or the navigation
    /// camera at the preview size, after applying pending navigation.
    /// Returns the color view and its size.
    fn render_preview(
        &mut self,
        ctx: &RenderCtx,
        scene: &mut Scene,
    ) -> Option<(wgpu::TextureView, (u32, u32))> {
        let nav = self.camera_view.take_navigation();

        let linked = self.preview.filter(|&id| scene.contains(id.into()));
        if self.preview.is_some() && linked.is_none() {
            log::debug!("gui '{}': previewed camera is gone", self.name);
            self.preview = None;
        }

        let camera = match linked {
            Some(id) => {
                let (cameras, sources) = scene.split();
                let camera = cameras.get_mut(id)?;
                navigate(camera, nav);
                match camera.render(ctx, sources) {
                    Ok(()) => Ok(&*camera),
                    Err(e) => Err(e),
                }
            }
            None => {
                let rect = self.layout.camera;
                navigate(&mut self.nav, nav);
                self.nav
                    .set_size(rect.size.x.round().max(1.0) as u32, rect.size.y.round().max(1.0) as u32);
                match self.nav.render(ctx, scene.sources()) {
                    Ok(()) => Ok(&self.nav),
                    Err(e) => Err(e),
                }
            }
        };
        match camera {
            Ok(camera) => {
                let spec = camera.output().spec();
                let view = camera.output().view()?.clone();
                Some((view, (spec.width, spec.height)))
            }
            Err(e) => {
                log::warn!("gui '{}' preview: {e}", self.name);
                None
            }
        }
    }

    fn sync_size(&mut self) {
        let spec = self.color.spec();
        if spec.width > 0 && spec.height > 0 {
            self.width = spec.width;
            self.height = spec.height;
        }
    }

    fn relayout(&mut self) {
        self.layout = OverlayLayout::compute(self.width as f32, self.height as f32);
        self.help.set_rect(self.layout.help);
        self.profile.set_rect(self.layout.profile);
        self.log.set_rect(self.layout.log);
        self.graph.set_rect(self.layout.graph);
        self.camera_view.set_rect(self.layout.camera);
    }

    fn widgets_mut(&mut self) -> [&mut dyn Widget; 5] {
        [
            &mut self.camera_view,
            &mut self.log,
            &mut self.graph,
            &mut self.profile,
            &mut self.help,
        ]
    }
}

fn navigate(camera: &mut Camera, nav: Navigation) {
    if nav.is_identity() {
        return;
    }
    camera.orbit(-nav.orbit.x, nav.orbit.y);
    camera.dolly(nav.dolly);
}

impl std::fmt::Debug for Gui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gui")
            .field("name", &self.name)
            .field("size", &(self.width, self.height))
            .field("visible", &self.visible)
            .field("preview", &self.preview)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use lumen_engine::image::Image;
    use lumen_engine::input::{ButtonState, MouseButton};
    use lumen_engine::scene::Object;

    use super::*;

    fn gui() -> Gui {
        Gui::new("gui", LogSink::with_capacity(16), Arc::new(Timer::new()))
    }

    fn key(key: Key, action: KeyAction, modifiers: Modifiers) -> InputEvent {
        InputEvent::Key {
            key,
            action,
            modifiers,
        }
    }

    #[test]
    fn link_to_dispatches_on_node_kind() {
        let mut scene = Scene::new();
        let cam = scene.add_camera(Camera::new("c", 32, 32));
        let obj = scene.add_object(Object::plane("o", 1.0, 1.0));
        let img = scene.add_image("i", Arc::new(Image::new()));
        let mut g = gui();

        assert!(g.link_to(cam.into(), &scene));
        assert_eq!(g.preview(), Some(cam));
        assert!(g.link_to(obj.into(), &scene));
        assert_eq!(g.navigation_camera().objects(), &[obj]);
        assert!(!g.link_to(img.into(), &scene));

        scene.remove_object(obj);
        assert!(!g.link_to(obj.into(), &scene));
        assert_eq!(g.navigation_camera().objects(), &[obj]);
    }

    #[test]
    fn reserved_keys_post_messages() {
        let mut scene = Scene::new();
        let mut g = gui();

        assert!(g.handle_event(&key(Key::S, KeyAction::Press, Modifiers::CTRL), &mut scene));
        let shift_ctrl = Modifiers {
            shift: true,
            ..Modifiers::CTRL
        };
        g.handle_event(&key(Key::S, KeyAction::Press, shift_ctrl), &mut scene);
        g.handle_event(&key(Key::S, KeyAction::Press, Modifiers::NONE), &mut scene);
        assert!(g.handle_event(&key(Key::Escape, KeyAction::Release, Modifiers::NONE), &mut scene));
        assert_eq!(scene.drain_messages(), [SceneMessage::Save, SceneMessage::Quit]);

        let before = scene.blending_generation();
        g.handle_event(&key(Key::B, KeyAction::Press, Modifiers::NONE), &mut scene);
        g.handle_event(&key(Key::B, KeyAction::Release, Modifiers::NONE), &mut scene);
        assert_eq!(scene.blending_generation(), before + 1);
    }

    #[test]
    fn tab_toggles_visibility_and_timer() {
        let mut scene = Scene::new();
        let timer = Arc::new(Timer::new());
        let mut g = Gui::new("gui", LogSink::with_capacity(4), timer.clone());

        g.handle_event(&key(Key::Tab, KeyAction::Press, Modifiers::NONE), &mut scene);
        assert!(!g.is_visible());
        assert!(!timer.is_enabled());
        g.handle_event(&key(Key::Tab, KeyAction::Repeat, Modifiers::NONE), &mut scene);
        assert!(!g.is_visible());
        g.handle_event(&key(Key::Tab, KeyAction::Press, Modifiers::NONE), &mut scene);
        assert!(g.is_visible());
        assert!(timer.is_enabled());
    }

    #[test]
    fn hidden_overlay_ignores_pointer() {
        let mut scene = Scene::new();
        let mut g = gui();
        let pos = g.layout().camera.origin + glam::Vec2::splat(4.0);
        let press = InputEvent::PointerButton {
            button: MouseButton::Left,
            state: ButtonState::Pressed,
            x: pos.x,
            y: pos.y,
            modifiers: Modifiers::NONE,
        };
        assert!(g.handle_event(&press, &mut scene));

        g.handle_event(&key(Key::Tab, KeyAction::Press, Modifiers::NONE), &mut scene);
        assert!(!g.handle_event(&press, &mut scene));
    }

    #[test]
    fn size_attribute_tracks_valid_sizes() {
        let mut g = gui();
        assert_eq!(g.size(), (640, 480));
        assert!(g.set_attribute("size", &[Value::from(800), Value::from(600)]));
        assert_eq!(g.size(), (800, 600));

        assert!(!g.set_attribute("size", &[Value::from(0), Value::from(600)]));
        assert!(!g.set_attribute("size", &[Value::from(800)]));
        assert!(!g.set_attribute("eye", &[Value::from(1), Value::from(2)]));
        assert_eq!(g.size(), (800, 600));
    }
}
