//! Offscreen overlay tests. Each test returns early when no adapter is available.

use std::sync::Arc;

use lumen_engine::logging::LogSink;
use lumen_engine::render::RenderCtx;
use lumen_engine::scene::{Camera, Object, Scene, Value};
use lumen_engine::time::Timer;
use lumen_ui::layout::OverlayLayout;
use lumen_ui::Gui;

fn ctx() -> Option<RenderCtx> {
    match pollster::block_on(RenderCtx::headless()) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            None
        }
    }
}

fn gui() -> Gui {
    Gui::new("gui", LogSink::with_capacity(32), Arc::new(Timer::new()))
}

#[test]
fn first_render_allocates_tracked_size() {
    let Some(ctx) = ctx() else { return };
    let mut scene = Scene::new();
    let mut g = gui();

    assert!(g.render(&ctx, &mut scene).is_ok());
    let spec = g.output().spec();
    assert_eq!((spec.width, spec.height), (640, 480));
    assert!(spec.mip_level_count() > 1);
}

#[test]
fn size_attribute_relayouts_before_drawing() {
    let Some(ctx) = ctx() else { return };
    let mut scene = Scene::new();
    let mut g = gui();
    g.render(&ctx, &mut scene).ok();

    assert!(g.set_attribute("size", &[Value::from(320), Value::from(240)]));
    assert!(g.render(&ctx, &mut scene).is_ok());

    let spec = g.output().spec();
    assert_eq!((spec.width, spec.height), (320, 240));
    assert_eq!(*g.layout(), OverlayLayout::compute(320.0, 240.0));
}

#[test]
fn preview_keeps_linked_camera_size() {
    let Some(ctx) = ctx() else { return };
    let mut scene = Scene::new();
    let plane = scene.add_object(Object::plane("plane", 1.0, 1.0));
    let cam = scene.add_camera(Camera::new("projector", 128, 72));
    scene.link(cam, plane.into());
    scene.prepare_objects(&ctx);

    let mut g = gui();
    assert!(g.link_to(cam.into(), &scene));
    assert!(g.render(&ctx, &mut scene).is_ok());
    assert!(scene.render_cameras(&ctx).is_ok());

    let camera = scene.camera(cam).unwrap();
    assert_eq!(camera.size(), (128, 72));
    let spec = camera.output().spec();
    assert_eq!((spec.width, spec.height), (128, 72));
}

#[test]
fn unlinked_preview_renders_navigation_camera_at_preview_size() {
    let Some(ctx) = ctx() else { return };
    let mut scene = Scene::new();
    let plane = scene.add_object(Object::plane("plane", 1.0, 1.0));
    scene.prepare_objects(&ctx);

    let mut g = gui();
    assert!(g.link_to(plane.into(), &scene));
    assert!(g.render(&ctx, &mut scene).is_ok());

    let preview = g.layout().camera;
    let nav = g.navigation_camera();
    assert_eq!(
        nav.size(),
        (preview.size.x.round() as u32, preview.size.y.round() as u32)
    );
    assert!(nav.output().is_allocated());
}

#[test]
fn oversized_output_is_clamped_to_device_limit() {
    let Some(ctx) = ctx() else { return };
    let mut scene = Scene::new();
    let mut g = gui();
    let limit = ctx.max_texture_dimension();

    for _ in 0..3 {
        assert!(g.set_output_size(limit + 1, 480));
        assert!(g.render(&ctx, &mut scene).is_ok());
    }

    let spec = g.output().spec();
    assert_eq!((spec.width, spec.height), (limit, 480));
    assert_eq!(g.size(), (limit, 480));
    assert_eq!(*g.layout(), OverlayLayout::compute(limit as f32, 480.0));
}

#[test]
fn hidden_overlay_still_clears_output() {
    let Some(ctx) = ctx() else { return };
    let mut scene = Scene::new();
    let mut g = gui();
    let tab = lumen_engine::input::InputEvent::Key {
        key: lumen_engine::input::Key::Tab,
        action: lumen_engine::input::KeyAction::Press,
        modifiers: lumen_engine::input::Modifiers::NONE,
    };
    g.handle_event(&tab, &mut scene);
    assert!(!g.is_visible());
    assert!(g.render(&ctx, &mut scene).is_ok());
    assert!(g.output().is_allocated());
}
