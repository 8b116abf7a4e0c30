//! Offscreen GPU tests. Each test returns early when no adapter is available.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use lumen_engine::image::{Image, ImageBuf, ImageSpec, PixelFormat};
use lumen_engine::render::{RenderCtx, RenderError};
use lumen_engine::scene::{Camera, Object, Scene};
use lumen_engine::shader::{shading, ShaderProgram, ShaderStage, ShaderState, Sideness};
use lumen_engine::texture::{Texture, TextureSpec};

const RED: [u8; 3] = [255, 0, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const CYAN: [u8; 3] = [0, 255, 255];

fn ctx() -> Option<RenderCtx> {
    match pollster::block_on(RenderCtx::headless()) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            None
        }
    }
}

/// Copies the texel at the center of level 0 back to the CPU.
fn read_center(ctx: &RenderCtx, texture: &Texture) -> [u8; 4] {
    let spec = texture.spec();
    let raw = texture.raw().expect("allocated texture");
    let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback"),
        size: 256,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx.create_encoder("readback");
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: raw,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: spec.width / 2,
                y: spec.height / 2,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(256),
                rows_per_image: Some(1),
            },
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    ctx.submit(encoder);

    let slice = buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, |_| {});
    ctx.device()
        .poll(wgpu::PollType::wait_indefinitely())
        .expect("readback poll");
    let data = slice.get_mapped_range();
    [data[0], data[1], data[2], data[3]]
}

fn solid(rgb: [u8; 3]) -> Image {
    let data = rgb.iter().copied().cycle().take(4 * 4 * 3).collect();
    let buf = ImageBuf::from_raw(ImageSpec::new(4, 4, 3, PixelFormat::U8), data).expect("4x4 rgb");
    Image::from(buf)
}

/// Renders a unit plane with `layers` through the default program and
/// returns the center pixel, together with the camera's view matrix.
fn render_plane(ctx: &RenderCtx, sideness: Sideness, layers: &[[u8; 3]]) -> ([u8; 4], glam::Mat4) {
    let mut scene = Scene::new();
    let mut object = Object::plane("screen", 1.0, 1.0);
    object.set_sideness(sideness);
    let plane = scene.add_object(object);
    for (i, rgb) in layers.iter().enumerate() {
        let image = scene.add_image(format!("layer{i}"), Arc::new(solid(*rgb)));
        assert!(scene.link_texture(plane, image));
    }

    let mut camera = Camera::new("main", 32, 32);
    camera.look_at(Vec3::new(0.0, -0.5, 2.0), Vec3::ZERO);
    let view = camera.view_matrix();
    let cam = scene.add_camera(camera);
    assert!(scene.link(cam, plane.into()));

    scene.upload_images(ctx);
    scene.prepare_objects(ctx);
    scene.render_cameras(ctx).expect("render");
    let pixel = read_center(ctx, scene.camera(cam).expect("camera").output());
    (pixel, view)
}

/// What the default program should output for the same plane, from the CPU rules.
fn reference(sideness: Sideness, layers: &[[u8; 3]], view: glam::Mat4) -> [u8; 4] {
    let normal = view.inverse().transpose() * Vec4::new(0.0, 0.0, 1.0, 0.0);
    if shading::discards(sideness, normal.z) {
        return [0, 0, 0, 255];
    }
    let layer = |i: usize| {
        layers.get(i).map_or(Vec4::ZERO, |c| {
            Vec4::new(c[0] as f32, c[1] as f32, c[2] as f32, 255.0) / 255.0
        })
    };
    let out = shading::composite(layers.len() as u32, layer(0), layer(1)) * 255.0;
    out.round().to_array().map(|v| v as u8)
}

fn assert_close(actual: [u8; 4], expected: [u8; 4], what: &str) {
    let close = actual
        .iter()
        .zip(expected)
        .all(|(&a, e)| a.abs_diff(e) <= 2);
    assert!(close, "{what}: got {actual:?}, expected {expected:?}");
}

#[test]
fn resize_is_idempotent() {
    let Some(ctx) = ctx() else { return };
    let mut tex = Texture::new("t", TextureSpec::color(0, 0));

    assert!(tex.resize(&ctx, 32, 16));
    let id = tex.id();
    assert!(!tex.resize(&ctx, 32, 16));
    assert_eq!(tex.id(), id);

    assert!(!tex.resize(&ctx, 0, 16));
    assert_eq!(tex.spec().width, 32);

    assert!(tex.resize(&ctx, 64, 16));
    assert_ne!(tex.id(), id);
}

#[test]
fn oversized_reset_keeps_previous_storage() {
    let Some(ctx) = ctx() else { return };
    let mut tex = Texture::new("t", TextureSpec::color(8, 8));
    tex.reset(&ctx, TextureSpec::color(8, 8), None).expect("small texture");
    let id = tex.id();

    let limit = ctx.max_texture_dimension();
    let err = tex
        .reset(&ctx, TextureSpec::color(limit + 1, 8), None)
        .expect_err("over the limit");
    assert!(matches!(err, RenderError::TextureTooLarge { .. }));
    assert_eq!(tex.id(), id);
    assert_eq!(tex.spec().width, 8);
    assert!(tex.is_allocated());
}

#[test]
fn upload_follows_image_shape() {
    let Some(ctx) = ctx() else { return };
    let image = Image::new();
    image
        .set_empty(64, 64, 4, PixelFormat::U8)
        .expect("shape fits");
    image.set_to(255u8);

    let mut tex = Texture::new("t", TextureSpec::color(0, 0));
    tex.upload(&ctx, &image).expect("upload");
    assert_eq!((tex.spec().width, tex.spec().height), (64, 64));
    assert!(tex.spec().mip_level_count() > 1);
    assert!(ctx.check_errors("upload").is_ok());
}

#[test]
fn default_program_links() {
    let Some(ctx) = ctx() else { return };
    let mut program = ShaderProgram::new("default");
    program.activate(&ctx).expect("default program");
    assert_eq!(program.state(), ShaderState::Linked);

    program.set_source(ShaderStage::Fragment, "this is not wgsl");
    assert!(program.activate(&ctx).is_err());
    assert_eq!(program.state(), ShaderState::Failed);
}

#[test]
fn camera_renders_textured_plane() {
    let Some(ctx) = ctx() else { return };
    let mut scene = Scene::new();

    let mut buf = ImageBuf::new(ImageSpec::new(16, 16, 3, PixelFormat::U16)).expect("shape fits");
    buf.fill(u16::MAX);
    let image = scene.add_image("white", Arc::new(Image::from(buf)));
    let plane = scene.add_object(Object::plane("screen", 1.0, 1.0));
    let cam = scene.add_camera(Camera::new("main", 48, 32));

    assert!(scene.link_texture(plane, image));
    assert!(scene.link(cam, plane.into()));

    assert_eq!(scene.upload_images(&ctx), 1);
    assert_eq!(scene.upload_images(&ctx), 0);
    scene.prepare_objects(&ctx);
    scene.render_cameras(&ctx).expect("render");

    let out = scene.camera(cam).map(|c| c.output().spec());
    assert_eq!(out.map(|s| (s.width, s.height)), Some((48, 32)));
}

#[test]
fn sideness_discards_match_cpu_rules() {
    let Some(ctx) = ctx() else { return };
    for sideness in [Sideness::DoubleSided, Sideness::SingleSided, Sideness::Inverted] {
        let (pixel, view) = render_plane(&ctx, sideness, &[RED]);
        assert_close(pixel, reference(sideness, &[RED], view), &format!("{sideness:?}"));
    }

    // The plane faces the camera: only the single-sided variant drops it.
    let (double, _) = render_plane(&ctx, Sideness::DoubleSided, &[RED]);
    let (single, _) = render_plane(&ctx, Sideness::SingleSided, &[RED]);
    assert_close(double, [255, 0, 0, 255], "double sided");
    assert_close(single, [0, 0, 0, 255], "single sided");
}

#[test]
fn second_layer_blends_unless_key_color() {
    let Some(ctx) = ctx() else { return };

    let (pixel, view) = render_plane(&ctx, Sideness::DoubleSided, &[RED, BLUE]);
    assert_close(pixel, reference(Sideness::DoubleSided, &[RED, BLUE], view), "red + blue");
    assert_close(pixel, [51, 0, 204, 255], "red + blue");

    let (pixel, view) = render_plane(&ctx, Sideness::DoubleSided, &[RED, CYAN]);
    assert_close(pixel, reference(Sideness::DoubleSided, &[RED, CYAN], view), "red + cyan");
    assert_close(pixel, [255, 0, 0, 255], "red + cyan");

    let (pixel, view) = render_plane(&ctx, Sideness::DoubleSided, &[]);
    assert_close(pixel, reference(Sideness::DoubleSided, &[], view), "untextured");
}

#[test]
fn failed_compile_keeps_earlier_device_errors() {
    let Some(ctx) = ctx() else { return };
    let mut program = ShaderProgram::new("broken");
    program.set_source(ShaderStage::Fragment, "this is not wgsl");

    ctx.errors().push("earlier upload error");
    assert!(program.activate(&ctx).is_err());

    match ctx.check_errors("after compile") {
        Err(RenderError::Gpu { message, .. }) => {
            assert!(message.contains("earlier upload error"), "{message}");
            assert!(!message.contains("not wgsl"), "{message}");
        }
        other => panic!("earlier error lost: {other:?}"),
    }
}
