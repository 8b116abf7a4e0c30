mod config;
mod snapshot;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use flume::Sender;
use glam::Vec3;

use lumen_engine::core::AppControl;
use lumen_engine::image::{BufferObject, Image, ImageBuf, ImageSpec, PixelFormat};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::scene::{Camera, ImageId, Object, Scene, SceneMessage};
use lumen_ui::{Application, ImageUpdate};

use config::StudioConfig;
use snapshot::SceneSnapshot;

/// Pattern frames streamed when no image is given.
const STREAM_SIZE: u32 = 256;
const STREAM_INTERVAL: Duration = Duration::from_millis(33);

fn main() -> Result<()> {
    let config = StudioConfig::parse();
    let logs = init_logging(LoggingConfig {
        env_filter: config.log_filter.clone(),
        ..LoggingConfig::default()
    });
    log::info!("starting {} ({config:?})", config.title);

    let (scene, image) = demo_scene(&config);
    let save_path = config.save_path.clone();

    let mut app = Application::new(scene, logs)
        .title(config.title.clone())
        .size(1280.0, 720.0)
        .fullscreen(config.fullscreen)
        .on_message(move |scene, message| match message {
            SceneMessage::Save => {
                match SceneSnapshot::capture(scene).save(&save_path) {
                    Ok(()) => log::info!("scene saved to '{}'", save_path.display()),
                    Err(e) => log::error!("save failed: {e:#}"),
                }
                AppControl::Continue
            }
            SceneMessage::Quit => {
                log::info!("quit requested");
                AppControl::Exit
            }
        });

    if let Some(index) = config.monitor {
        app = app.monitor(index);
    }

    let font = load_font();
    if font.is_empty() {
        log::warn!("no system font found, the overlay will not show text");
    } else {
        app = app.font(font);
    }

    let main_camera = app.scene_mut().find_camera("main");
    if let Some(id) = main_camera {
        app = app.display(id).link_gui(id);
    }

    if config.image.is_none() {
        spawn_producer(app.sender(), image);
    }

    app.run()
}

/// A textured floor seen by the main camera.
fn demo_scene(config: &StudioConfig) -> (Scene, ImageId) {
    let mut scene = Scene::new();

    let pixels = Image::with_default_pattern();
    if let Some(path) = &config.image {
        if let Err(e) = pixels.read(path) {
            log::warn!("{e}; showing the calibration pattern");
        }
    }
    let image = scene.add_image("projection", Arc::new(pixels));

    let floor = scene.add_object(Object::plane("floor", 2.0, 2.0));
    scene.link_texture(floor, image);

    let mut camera = Camera::new("main", 1280, 720);
    camera.look_at(Vec3::new(2.0, 2.0, 1.5), Vec3::ZERO);
    let main = scene.add_camera(camera);
    scene.link(main, floor.into());

    (scene, image)
}

/// Streams a moving pattern to `image` until the world loop goes away.
fn spawn_producer(updates: Sender<ImageUpdate>, image: ImageId) {
    let spawned = thread::Builder::new()
        .name("lumen producer".to_string())
        .spawn(move || {
            let staging = Image::new();
            let spec = ImageSpec::new(STREAM_SIZE, STREAM_SIZE, 3, PixelFormat::U8);
            let mut frame: u32 = 0;
            loop {
                let Ok(mut buf) = ImageBuf::new(spec) else { return };
                paint_stripes(&mut buf, frame);
                staging.set(&buf);
                if updates.send((image, staging.serialize())).is_err() {
                    log::debug!("producer stopped after {frame} frames");
                    return;
                }
                frame = frame.wrapping_add(1);
                thread::sleep(STREAM_INTERVAL);
            }
        });
    if let Err(e) = spawned {
        log::error!("failed to start the producer thread: {e}");
    }
}

/// Diagonal RGB stripes scrolling with `frame`.
fn paint_stripes(buf: &mut ImageBuf, frame: u32) {
    let spec = buf.spec();
    let width = spec.width as usize;
    for (i, px) in buf.data_mut().chunks_exact_mut(3).enumerate() {
        let (x, y) = ((i % width) as u32, (i / width) as u32);
        let band = (x + y + frame * 2) / 32 % 3;
        px.copy_from_slice(match band {
            0 => &[230, 80, 60],
            1 => &[60, 200, 120],
            _ => &[70, 110, 230],
        });
    }
}

fn load_font() -> Vec<u8> {
    [
        "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scene_links_floor_to_main_camera() {
        let (scene, image) = demo_scene(&StudioConfig::default());
        let main = scene.find_camera("main").unwrap();
        let camera = scene.camera(main).unwrap();
        assert_eq!(camera.objects().len(), 1);
        let floor = scene.object(camera.objects()[0]).unwrap();
        assert_eq!(floor.textures(), &[image]);
    }

    #[test]
    fn stripes_cover_the_buffer() {
        let spec = ImageSpec::new(64, 8, 3, PixelFormat::U8);
        let mut buf = ImageBuf::new(spec).unwrap();
        paint_stripes(&mut buf, 5);
        assert!(buf.data().chunks_exact(3).all(|px| px != [0, 0, 0]));
    }
}
