use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use flume::{Receiver, Sender};
use winit::dpi::LogicalSize;

use lumen_engine::core::{App as EngineApp, AppControl, FrameCtx};
use lumen_engine::device::{GpuInit, SurfaceErrorAction};
use lumen_engine::image::{BufferObject, SerializedObject};
use lumen_engine::logging::LogSink;
use lumen_engine::render::BlendMode;
use lumen_engine::scene::{CameraId, ImageId, NodeHandle, Scene, SceneMessage};
use lumen_engine::time::Timer;
use lumen_engine::window::{Runtime, RuntimeConfig};

use crate::gui::Gui;

/// Serialized image content addressed to a scene image.
pub type ImageUpdate = (ImageId, SerializedObject);

/// Callback receiving the messages the overlay (or anything else) posted to
/// the scene during a frame.
pub type MessageHandler = Box<dyn FnMut(&mut Scene, SceneMessage) -> AppControl>;

/// World loop builder: owns the scene, the overlay and the window.
///
/// ```rust,ignore
/// let logs = init_logging(LoggingConfig::default());
/// let app = Application::new(scene, logs).title("lumen");
/// let updates = app.sender();
/// // hand `updates` to producer threads, then:
/// app.run()?;
/// ```
pub struct Application {
    title: String,
    width: f64,
    height: f64,
    fullscreen: bool,
    monitor: Option<usize>,
    gpu_init: GpuInit,

    scene: Scene,
    logs: LogSink,
    timer: Arc<Timer>,
    fonts: Vec<Vec<u8>>,
    display: Option<CameraId>,
    gui_links: Vec<NodeHandle>,
    on_message: Option<MessageHandler>,

    updates_tx: Sender<ImageUpdate>,
    updates_rx: Receiver<ImageUpdate>,
}

impl Application {
    pub fn new(scene: Scene, logs: LogSink) -> Self {
        let (updates_tx, updates_rx) = flume::unbounded();
        Self {
            title: "lumen".to_string(),
            width: 1280.0,
            height: 720.0,
            fullscreen: false,
            monitor: None,
            // Camera outputs hold display-ready values; an sRGB surface would
            // encode them twice.
            gpu_init: GpuInit {
                prefer_srgb: false,
                ..GpuInit::default()
            },
            scene,
            logs,
            timer: Arc::new(Timer::new()),
            fonts: Vec::new(),
            display: None,
            gui_links: Vec::new(),
            on_message: None,
            updates_tx,
            updates_rx,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    /// Monitor used when fullscreen.
    pub fn monitor(mut self, index: usize) -> Self {
        self.monitor = Some(index);
        self
    }

    pub fn gpu_init(mut self, init: GpuInit) -> Self {
        self.gpu_init = init;
        self
    }

    /// Camera whose output fills the window. Defaults to the first camera.
    pub fn display(mut self, camera: CameraId) -> Self {
        self.display = Some(camera);
        self
    }

    /// Overlay font. The first font that loads wins.
    pub fn font(mut self, bytes: Vec<u8>) -> Self {
        self.fonts.push(bytes);
        self
    }

    /// Links a scene node to the overlay once it is created (see [`Gui::link_to`]).
    pub fn link_gui(mut self, target: impl Into<NodeHandle>) -> Self {
        self.gui_links.push(target.into());
        self
    }

    /// Handles scene messages. Without a handler, `Quit` exits and `Save` is
    /// only logged.
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Scene, SceneMessage) -> AppControl + 'static,
    {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Channel producers use to push serialized image content; updates are
    /// applied at the start of each frame.
    pub fn sender(&self) -> Sender<ImageUpdate> {
        self.updates_tx.clone()
    }

    pub fn timer(&self) -> Arc<Timer> {
        Arc::clone(&self.timer)
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Opens the window and runs the world loop until exit.
    pub fn run(self) -> Result<()> {
        let config = RuntimeConfig {
            title: self.title.clone(),
            initial_size: LogicalSize::new(self.width, self.height),
            fullscreen: self.fullscreen,
            monitor: self.monitor,
        };
        let gpu_init = self.gpu_init.clone();
        let world = WorldLoop::new(self);
        Runtime::run(config, gpu_init, world)
    }
}

/// Engine-facing state of a running [`Application`].
struct WorldLoop {
    scene: Scene,
    gui: Gui,
    timer: Arc<Timer>,
    display: Option<CameraId>,
    on_message: Option<MessageHandler>,
    updates: Receiver<ImageUpdate>,
}

impl WorldLoop {
    fn new(app: Application) -> Self {
        let mut gui = Gui::new("gui", app.logs, Arc::clone(&app.timer));
        if !app.fonts.iter().any(|bytes| gui.load_font(bytes).is_ok()) {
            log::warn!("no usable overlay font, text is disabled");
        }
        for target in app.gui_links {
            if !gui.link_to(target, &app.scene) {
                log::warn!("gui cannot link to {target:?}");
            }
        }

        let display = app.display.or_else(|| app.scene.cameras().next().map(|(id, _)| id));
        if display.is_none() {
            log::warn!("scene has no camera to display");
        }

        // Dropping our sender lets the channel disconnect once producers stop.
        drop(app.updates_tx);

        Self {
            scene: app.scene,
            gui,
            timer: app.timer,
            display,
            on_message: app.on_message,
            updates: app.updates_rx,
        }
    }

    /// Applies every pending serialized update. Malformed blobs are logged
    /// and leave their image untouched.
    fn apply_updates(&mut self) -> usize {
        let mut applied = 0;
        for (id, object) in self.updates.try_iter() {
            let Some(image) = self.scene.image(id) else {
                log::warn!("update for unknown image {id:?} dropped");
                continue;
            };
            match image.image().deserialize(&object) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("image '{}': {e}", image.name()),
            }
        }
        applied
    }

    fn dispatch_messages(&mut self) -> AppControl {
        let mut control = AppControl::Continue;
        for message in self.scene.drain_messages() {
            let result = match self.on_message.as_mut() {
                Some(handler) => handler(&mut self.scene, message),
                None => match message {
                    SceneMessage::Quit => AppControl::Exit,
                    SceneMessage::Save => {
                        log::info!("save requested but no handler is installed");
                        AppControl::Continue
                    }
                },
            };
            if result == AppControl::Exit {
                control = AppControl::Exit;
            }
        }
        control
    }
}

impl EngineApp for WorldLoop {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let frame_start = Instant::now();
        let timer = Arc::clone(&self.timer);

        {
            let _t = timer.scope("buffer object update");
            self.apply_updates();
        }

        let rctx = ctx.gpu.ctx();
        {
            let _t = timer.scope("upload");
            self.scene.upload_images(rctx);
            self.scene.prepare_objects(rctx);
        }
        {
            let _t = timer.scope("cameras");
            // Failures are logged per camera.
            let _ = self.scene.render_cameras(rctx);
        }
        {
            let _t = timer.scope("guis");
            let _ = self.gui.render(rctx, &mut self.scene);
        }

        let windows_start = Instant::now();
        let frame = match ctx.gpu.begin_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::debug!("surface error: {e}");
                if ctx.gpu.handle_surface_error(e) == SurfaceErrorAction::Fatal {
                    log::error!("surface lost for good, exiting");
                    return AppControl::Exit;
                }
                None
            }
        };

        let size = ctx.gpu.size();
        if let Some(frame) = &frame {
            let rctx = ctx.gpu.ctx();
            let format = ctx.gpu.surface_format();
            let rect = [0.0, 0.0, size.width as f32, size.height as f32];

            let mut encoder = rctx.create_encoder("lumen window encoder");
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("lumen window pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });

                let display = self
                    .display
                    .and_then(|id| self.scene.camera(id))
                    .and_then(|camera| camera.output().view());
                if let Some(view) = display {
                    rctx.blitter()
                        .draw(rctx.device(), &mut pass, format, BlendMode::Replace, view, rect);
                }
                if self.gui.is_visible() {
                    if let Some(view) = self.gui.output().view() {
                        rctx.blitter().draw(
                            rctx.device(),
                            &mut pass,
                            format,
                            BlendMode::Premultiplied,
                            view,
                            rect,
                        );
                    }
                }
            }
            rctx.submit(encoder);
        }
        self.gui.set_output_size(size.width, size.height);
        self.gui.set_pointer_scale(ctx.window.scale_factor());
        timer.record("windows", windows_start.elapsed());

        if let Some(frame) = frame {
            let _t = timer.scope("swap");
            ctx.gpu.present(frame);
        }

        let control = {
            let _t = timer.scope("events");
            for event in &ctx.input_frame.events {
                self.gui.handle_event(event, &mut self.scene);
            }
            self.dispatch_messages()
        };

        timer.record("worldLoop", frame_start.elapsed());
        control
    }
}

#[cfg(test)]
mod tests {
    use lumen_engine::image::{Image, ImageBuf, ImageSpec, PixelFormat};

    use super::*;

    fn app() -> Application {
        Application::new(Scene::new(), LogSink::with_capacity(8))
    }

    #[test]
    fn updates_reach_their_image() {
        let mut app = app();
        let image = Arc::new(Image::new());
        let id = app.scene_mut().add_image("feed", Arc::clone(&image));
        let tx = app.sender();

        let source = Image::new();
        source.set(&ImageBuf::new(ImageSpec::new(4, 2, 3, PixelFormat::U8)).unwrap());
        tx.send((id, source.serialize())).unwrap();
        tx.send((id, SerializedObject::from_bytes(vec![1, 2, 3]))).unwrap();

        let mut world = WorldLoop::new(app);
        assert_eq!(world.apply_updates(), 1);
        assert_eq!(image.spec().width, 4);
        assert_eq!(image.spec().channels, 3);
    }

    #[test]
    fn quit_exits_without_handler() {
        let mut world = WorldLoop::new(app());
        world.scene.post(SceneMessage::Save);
        assert_eq!(world.dispatch_messages(), AppControl::Continue);
        world.scene.post(SceneMessage::Quit);
        assert_eq!(world.dispatch_messages(), AppControl::Exit);
    }

    #[test]
    fn handler_sees_every_message() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let app = app().on_message(move |_, message| {
            log.lock().push(message);
            AppControl::Continue
        });
        let mut world = WorldLoop::new(app);
        world.scene.post(SceneMessage::Save);
        world.scene.post(SceneMessage::Quit);
        assert_eq!(world.dispatch_messages(), AppControl::Continue);
        assert_eq!(*seen.lock(), [SceneMessage::Save, SceneMessage::Quit]);
    }
}
