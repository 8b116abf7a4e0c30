use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use lumen_engine::render::RenderCtx;
use lumen_engine::text::{FontId, FontSystem};
use lumen_engine::texture::TextureFormat;
use wgpu::util::DeviceExt;

use crate::draw::{DrawCmd, DrawList};
use crate::geometry::{Color, Rect};

use super::atlas::GlyphAtlas;

const MODE_SOLID: u32 = 0;
const MODE_GLYPH: u32 = 1;
const MODE_IMAGE: u32 = 2;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    size: [f32; 2],
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Corner {
    pos: [f32; 2],
}

const CORNERS: [Corner; 4] = [
    Corner { pos: [0.0, 0.0] },
    Corner { pos: [1.0, 0.0] },
    Corner { pos: [1.0, 1.0] },
    Corner { pos: [0.0, 1.0] },
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadInstance {
    origin: [f32; 2],
    size: [f32; 2],
    uv_min: [f32; 2],
    uv_max: [f32; 2],
    color: [f32; 4],
    mode: u32,
    _pad: [u32; 3],
}

impl QuadInstance {
    const ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        1 => Float32x2,
        2 => Float32x2,
        3 => Float32x2,
        4 => Float32x2,
        5 => Float32x4,
        6 => Uint32,
    ];

    fn new(rect: Rect, uv: ([f32; 2], [f32; 2]), color: Color, mode: u32) -> Self {
        Self {
            origin: rect.origin.to_array(),
            size: rect.size.to_array(),
            uv_min: uv.0,
            uv_max: uv.1,
            color: color.to_array(),
            mode,
            _pad: [0; 3],
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Texture a batch samples from. Solid fills accept any.
enum BatchTexture {
    Any,
    Atlas,
    Image(wgpu::BindGroup),
}

struct Batch {
    instances: Range<u32>,
    texture: BatchTexture,
    clip: Option<Rect>,
}

/// Draws an overlay [`DrawList`] into an `Rgba8` color + `Depth32` target.
///
/// All primitives are instanced quads of one pipeline; consecutive items
/// sharing a texture and a clip rect go out in one draw call, in paint order.
pub struct OverlayRenderer {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    globals: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,

    atlas: GlyphAtlas,
    atlas_group: wgpu::BindGroup,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,

    instances: Vec<QuadInstance>,
    batches: Vec<Batch>,
    target: (u32, u32),
    layout: Layout<()>,
}

impl OverlayRenderer {
    pub fn new(ctx: &RenderCtx) -> Self {
        let device = ctx.device();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lumen overlay shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen overlay globals bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ViewportUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen overlay texture bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen overlay pipeline layout"),
            bind_group_layouts: &[&globals_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lumen overlay pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Corner>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    },
                    QuadInstance::layout(),
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TextureFormat::Rgba8.to_wgpu(),
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // The overlay pass carries a depth attachment; widgets are flat.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: TextureFormat::Depth32.to_wgpu(),
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen overlay viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen overlay sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let globals = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen overlay globals"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: viewport_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let atlas = GlyphAtlas::new(ctx);
        let atlas_group = texture_group(device, &texture_layout, atlas.view());

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen overlay quad vbo"),
            contents: bytemuck::cast_slice(&CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen overlay quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            pipeline,
            texture_layout,
            globals,
            viewport_ubo,
            atlas,
            atlas_group,
            quad_vbo,
            quad_ibo,
            instance_vbo: None,
            instance_capacity: 0,
            instances: Vec::new(),
            batches: Vec::new(),
            target: (1, 1),
            layout: Layout::new(CoordinateSystem::PositiveYDown),
        }
    }

    /// Builds and uploads the instances of `list` for a `target`-sized pass.
    /// Must run before the pass is opened.
    pub fn prepare(
        &mut self,
        ctx: &RenderCtx,
        list: &DrawList,
        fonts: &FontSystem,
        font: Option<FontId>,
        target: (u32, u32),
    ) {
        self.instances.clear();
        self.batches.clear();
        self.target = (target.0.max(1), target.1.max(1));

        for item in list.items() {
            match &item.cmd {
                DrawCmd::Rect { rect, color } => {
                    let inst = QuadInstance::new(*rect, ([0.0; 2], [0.0; 2]), *color, MODE_SOLID);
                    self.push(inst, BatchTexture::Any, item.clip);
                }
                DrawCmd::Text { text, origin, size, color } => {
                    let Some(font) = font.and_then(|id| fonts.get(id)) else { continue };
                    self.layout.reset(&LayoutSettings {
                        x: origin.x,
                        y: origin.y,
                        ..LayoutSettings::default()
                    });
                    self.layout.append(&[font], &TextStyle::new(text, *size, 0));

                    let glyphs: Vec<(GlyphRasterConfig, Rect)> = self
                        .layout
                        .glyphs()
                        .iter()
                        .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
                        .map(|g| (g.key, Rect::new(g.x, g.y, g.width as f32, g.height as f32)))
                        .collect();
                    for (key, rect) in glyphs {
                        let Some(cell) = self.atlas.glyph(ctx, font, key) else { continue };
                        let inst = QuadInstance::new(rect, (cell.uv_min, cell.uv_max), *color, MODE_GLYPH);
                        self.push(inst, BatchTexture::Atlas, item.clip);
                    }
                }
                DrawCmd::Image { view, rect } => {
                    let group = texture_group(ctx.device(), &self.texture_layout, view);
                    let inst = QuadInstance::new(*rect, ([0.0; 2], [1.0; 2]), Color::WHITE, MODE_IMAGE);
                    self.push(inst, BatchTexture::Image(group), item.clip);
                }
            }
        }

        let viewport = ViewportUniform {
            size: [self.target.0 as f32, self.target.1 as f32],
            _pad: [0.0; 2],
        };
        ctx.queue().write_buffer(&self.viewport_ubo, 0, bytemuck::bytes_of(&viewport));

        if self.instances.is_empty() {
            return;
        }
        self.ensure_instance_capacity(ctx, self.instances.len());
        if let Some(vbo) = &self.instance_vbo {
            ctx.queue().write_buffer(vbo, 0, bytemuck::cast_slice(&self.instances));
        }
    }

    /// Records the prepared batches into an open pass.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(instance_vbo) = &self.instance_vbo else { return };
        if self.batches.is_empty() {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.globals, &[]);
        pass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        pass.set_vertex_buffer(1, instance_vbo.slice(..));
        pass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        for batch in &self.batches {
            let Some((x, y, w, h)) = scissor(batch.clip, self.target) else { continue };
            let group = match &batch.texture {
                BatchTexture::Image(group) => group,
                BatchTexture::Any | BatchTexture::Atlas => &self.atlas_group,
            };
            pass.set_bind_group(1, group, &[]);
            pass.set_scissor_rect(x, y, w, h);
            pass.draw_indexed(0..6, 0, batch.instances.clone());
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn push(&mut self, instance: QuadInstance, texture: BatchTexture, clip: Option<Rect>) {
        let index = self.instances.len() as u32;
        self.instances.push(instance);

        if let Some(last) = self.batches.last_mut().filter(|b| b.clip == clip) {
            let merged = match (&last.texture, &texture) {
                (_, BatchTexture::Any) => true,
                (BatchTexture::Any | BatchTexture::Atlas, BatchTexture::Atlas) => {
                    last.texture = BatchTexture::Atlas;
                    true
                }
                _ => false,
            };
            if merged {
                last.instances.end = index + 1;
                return;
            }
        }
        self.batches.push(Batch {
            instances: index..index + 1,
            texture,
            clip,
        });
    }

    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }
        let capacity = required.next_power_of_two().max(256);
        self.instance_vbo = Some(ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen overlay instance vbo"),
            size: (capacity * std::mem::size_of::<QuadInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = capacity;
    }
}

fn texture_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("lumen overlay texture group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(view),
        }],
    })
}

/// Clip rect to scissor arguments clamped to the target; `None` when nothing
/// of the clip is visible.
pub(crate) fn scissor(clip: Option<Rect>, target: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    let (tw, th) = target;
    let Some(r) = clip else {
        return Some((0, 0, tw, th));
    };
    let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);
    let x0 = clamp(r.origin.x, tw);
    let y0 = clamp(r.origin.y, th);
    let x1 = clamp(r.max().x.ceil(), tw);
    let y1 = clamp(r.max().y.ceil(), th);
    let (w, h) = (x1.saturating_sub(x0), y1.saturating_sub(y0));
    (w > 0 && h > 0).then_some((x0, y0, w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scissor_clamps_to_target() {
        assert_eq!(scissor(None, (64, 32)), Some((0, 0, 64, 32)));
        assert_eq!(
            scissor(Some(Rect::new(-4.0, 8.0, 100.0, 8.5)), (64, 32)),
            Some((0, 8, 64, 9))
        );
        assert_eq!(scissor(Some(Rect::new(70.0, 0.0, 5.0, 5.0)), (64, 32)), None);
        assert_eq!(scissor(Some(Rect::default()), (64, 32)), None);
    }

    #[test]
    fn instance_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<QuadInstance>(), 64);
    }
}
