use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::render::RenderCtx;
use crate::texture::{Texture, TextureFormat, TextureId};

use super::{ShaderError, Vertex};

/// Texture units available to a program (`tex0`, `tex1`).
pub const MAX_TEXTURE_UNITS: usize = 2;

const DEFAULT_SOURCE: &str = include_str!("default.wgsl");

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ShaderStage {
    Vertex,
    /// Recorded for completeness; WGSL has no geometry stage and it is ignored at link.
    Geometry,
    Fragment,
}

impl ShaderStage {
    const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Geometry => "gs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderState {
    Unlinked,
    Compiling,
    Linked,
    Failed,
}

/// Which faces survive the fragment stage, judged by the view-space normal
/// against `+Z`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Sideness {
    #[default]
    DoubleSided,
    SingleSided,
    Inverted,
}

impl Sideness {
    const fn as_uniform(self) -> i32 {
        match self {
            Sideness::DoubleSided => 0,
            Sideness::SingleSided => 1,
            Sideness::Inverted => 2,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_projection: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    sideness: i32,
    texture_count: i32,
    _pad: [i32; 2],
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<Uniforms>() as u64;

#[derive(Clone)]
struct TextureBinding {
    id: TextureId,
    view: wgpu::TextureView,
}

/// Per-draw uniform slots addressed with dynamic offsets.
struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    slots: u64,
    cursor: u64,
}

impl UniformRing {
    fn new(ctx: &RenderCtx, layout: &wgpu::BindGroupLayout, slots: u64) -> Self {
        let align = ctx.device().limits().min_uniform_buffer_offset_alignment as u64;
        let stride = UNIFORM_SIZE.div_ceil(align) * align;

        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen program uniforms"),
            size: stride * slots,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen program uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_SIZE),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            stride,
            slots,
            cursor: 0,
        }
    }

    /// Writes `u` into the next slot and returns its offset. Grows (into a
    /// fresh buffer) when full; passes already recorded keep the old one alive.
    fn push(&mut self, ctx: &RenderCtx, layout: &wgpu::BindGroupLayout, u: &Uniforms) -> u32 {
        if self.cursor == self.slots {
            *self = Self::new(ctx, layout, self.slots * 2);
        }
        let offset = self.cursor * self.stride;
        ctx.queue().write_buffer(&self.buffer, offset, bytemuck::bytes_of(u));
        self.cursor += 1;
        offset as u32
    }
}

/// GPU objects produced by a successful link.
struct Linked {
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    placeholder: wgpu::TextureView,
    ring: UniformRing,
    texture_groups: HashMap<[Option<TextureId>; MAX_TEXTURE_UNITS], wgpu::BindGroup>,
}

impl Linked {
    fn texture_group(
        &mut self,
        ctx: &RenderCtx,
        units: &[Option<TextureBinding>; MAX_TEXTURE_UNITS],
    ) -> wgpu::BindGroup {
        let key = [0, 1].map(|i| units[i].as_ref().map(|b| b.id));
        if let Some(group) = self.texture_groups.get(&key) {
            return group.clone();
        }
        // Ids change on reallocation, so stale entries are never hit again.
        if self.texture_groups.len() >= 64 {
            self.texture_groups.clear();
        }

        let view = |i: usize| units[i].as_ref().map_or(&self.placeholder, |b| &b.view);
        let group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen program textures"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view(0)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view(1)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.texture_groups.insert(key, group.clone());
        group
    }
}

/// A vertex + fragment program with its uniform state.
///
/// Sources are WGSL; a single source may carry both entry points
/// (`vs_main`, `fs_main`), in which case attaching it to the vertex stage is
/// enough. New programs start with the default projection shader attached.
pub struct ShaderProgram {
    name: String,
    sources: BTreeMap<ShaderStage, String>,
    modules: BTreeMap<ShaderStage, wgpu::ShaderModule>,
    state: ShaderState,
    dirty: bool,
    linked: Option<Linked>,

    sideness: Sideness,
    view_projection: Mat4,
    normal_matrix: Mat4,
    units: [Option<TextureBinding>; MAX_TEXTURE_UNITS],
}

impl ShaderProgram {
    pub fn new(name: impl Into<String>) -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(ShaderStage::Vertex, DEFAULT_SOURCE.to_owned());
        sources.insert(ShaderStage::Fragment, DEFAULT_SOURCE.to_owned());
        Self {
            name: name.into(),
            sources,
            modules: BTreeMap::new(),
            state: ShaderState::Unlinked,
            dirty: true,
            linked: None,
            sideness: Sideness::default(),
            view_projection: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            units: [None, None],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ShaderState {
        self.state
    }

    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        self.sources.get(&stage).map(String::as_str)
    }

    /// Attaches `source` to `stage`. The program recompiles on the next
    /// [`activate`](Self::activate).
    pub fn set_source(&mut self, stage: ShaderStage, source: impl Into<String>) {
        if stage == ShaderStage::Geometry {
            log::warn!("program '{}': geometry stage is recorded but not supported", self.name);
        }
        self.sources.insert(stage, source.into());
        self.state = ShaderState::Compiling;
        self.dirty = true;
    }

    /// Like [`set_source`](Self::set_source), reading the source from a file.
    /// A read failure leaves the program unchanged.
    pub fn set_source_from_file(
        &mut self,
        stage: ShaderStage,
        path: impl AsRef<Path>,
    ) -> Result<(), ShaderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.set_source(stage, source);
        Ok(())
    }

    /// Compiles every attached stage, logging diagnostics.
    pub fn compile_program(&mut self, ctx: &RenderCtx) -> Result<(), ShaderError> {
        self.dirty = false;
        self.modules.clear();
        self.state = ShaderState::Compiling;

        for (&stage, source) in &self.sources {
            if stage == ShaderStage::Geometry {
                continue;
            }
            let mark = ctx.errors().pending();
            let module = ctx.device().create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&self.name),
                source: wgpu::ShaderSource::Wgsl(source.as_str().into()),
            });

            let info = pollster::block_on(module.get_compilation_info());
            let mut errors = Vec::new();
            for msg in &info.messages {
                let line = msg.location.as_ref().map_or(0, |l| l.line_number);
                match msg.message_type {
                    wgpu::CompilationMessageType::Error => {
                        errors.push(format!("{line}: {}", msg.message));
                    }
                    wgpu::CompilationMessageType::Warning => {
                        log::warn!("program '{}' {stage:?}:{line}: {}", self.name, msg.message);
                    }
                    wgpu::CompilationMessageType::Info => {
                        log::debug!("program '{}' {stage:?}:{line}: {}", self.name, msg.message);
                    }
                }
            }

            if !errors.is_empty() {
                // The device reports the same failure as an uncaptured error.
                ctx.errors().discard_since(mark);
                self.state = ShaderState::Failed;
                let log = errors.join("\n");
                log::error!("program '{}': {stage:?} stage failed to compile:\n{log}", self.name);
                return Err(ShaderError::Compile {
                    program: self.name.clone(),
                    stage,
                    log,
                });
            }

            log::debug!("program '{}': {stage:?} stage compiled", self.name);
            self.modules.insert(stage, module);
        }
        Ok(())
    }

    /// Builds the pipeline from compiled stages.
    pub fn link_program(&mut self, ctx: &RenderCtx) -> Result<(), ShaderError> {
        let Some(vertex) = self.modules.get(&ShaderStage::Vertex) else {
            self.state = ShaderState::Failed;
            return Err(ShaderError::MissingStage {
                program: self.name.clone(),
                stage: ShaderStage::Vertex,
            });
        };
        let fragment = self.modules.get(&ShaderStage::Fragment).unwrap_or(vertex);

        let device = ctx.device();
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen program uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen program texture bgl"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen program pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&self.name),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some(ShaderStage::Vertex.entry_point()),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some(ShaderStage::Fragment.entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TextureFormat::Rgba8.to_wgpu(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: TextureFormat::Depth32.to_wgpu(),
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Err(e) = ctx.check_errors("shader link") {
            self.state = ShaderState::Failed;
            self.linked = None;
            log::error!("program '{}' failed to link: {e}", self.name);
            return Err(ShaderError::Compile {
                program: self.name.clone(),
                stage: ShaderStage::Fragment,
                log: e.to_string(),
            });
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen program sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let ring = UniformRing::new(ctx, &uniform_layout, 16);
        self.linked = Some(Linked {
            pipeline,
            uniform_layout,
            texture_layout,
            sampler,
            placeholder: placeholder_view(ctx),
            ring,
            texture_groups: HashMap::new(),
        });
        self.state = ShaderState::Linked;
        log::debug!("program '{}' linked", self.name);
        Ok(())
    }

    /// Makes the program ready for [`bind`](Self::bind), recompiling and
    /// relinking first when a source changed. Call once per render pass.
    pub fn activate(&mut self, ctx: &RenderCtx) -> Result<(), ShaderError> {
        if self.dirty {
            self.compile_program(ctx)?;
            self.link_program(ctx)?;
        }
        match (&mut self.linked, self.state) {
            (Some(linked), ShaderState::Linked) => {
                linked.ring.cursor = 0;
                Ok(())
            }
            _ => Err(ShaderError::NotLinked {
                program: self.name.clone(),
            }),
        }
    }

    /// Drops per-draw texture bindings. Idempotent.
    pub fn deactivate(&mut self) {
        self.units = [None, None];
    }

    /// Binds `texture` to sampler `unit` (`0` is `tex0`). Unallocated textures
    /// and out-of-range units are ignored.
    pub fn set_texture(&mut self, texture: &Texture, unit: usize, name: &str) {
        if unit >= MAX_TEXTURE_UNITS {
            log::warn!("program '{}': texture unit {unit} ('{name}') out of range", self.name);
            return;
        }
        let Some(view) = texture.view() else {
            log::debug!("program '{}': '{name}' has no storage yet", self.name);
            return;
        };
        self.units[unit] = Some(TextureBinding {
            id: texture.id(),
            view: view.clone(),
        });
    }

    /// Number of bound texture units, as seen by the fragment stage.
    pub fn texture_count(&self) -> usize {
        self.units.iter().flatten().count()
    }

    pub fn sideness(&self) -> Sideness {
        self.sideness
    }

    pub fn set_sideness(&mut self, sideness: Sideness) {
        self.sideness = sideness;
    }

    pub fn set_view_projection_matrix(&mut self, m: Mat4) {
        self.view_projection = m;
    }

    pub fn set_normal_matrix(&mut self, m: Mat4) {
        self.normal_matrix = m;
    }

    /// Records the pipeline, current uniforms and textures into `pass`.
    pub fn bind(&mut self, ctx: &RenderCtx, pass: &mut wgpu::RenderPass<'_>) -> Result<(), ShaderError> {
        let texture_count = self.texture_count() as i32;
        let Some(linked) = self.linked.as_mut().filter(|_| self.state == ShaderState::Linked) else {
            return Err(ShaderError::NotLinked {
                program: self.name.clone(),
            });
        };

        let uniforms = Uniforms {
            view_projection: self.view_projection.to_cols_array_2d(),
            normal_matrix: self.normal_matrix.to_cols_array_2d(),
            sideness: self.sideness.as_uniform(),
            texture_count,
            _pad: [0; 2],
        };
        let offset = linked.ring.push(ctx, &linked.uniform_layout, &uniforms);
        let textures = linked.texture_group(ctx, &self.units);

        pass.set_pipeline(&linked.pipeline);
        pass.set_bind_group(0, &linked.ring.bind_group, &[offset]);
        pass.set_bind_group(1, &textures, &[]);
        Ok(())
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("sideness", &self.sideness)
            .field("textures", &self.texture_count())
            .finish()
    }
}

/// 1x1 opaque white, bound to units without a texture.
fn placeholder_view(ctx: &RenderCtx) -> wgpu::TextureView {
    let texture = ctx.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("lumen placeholder texture"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TextureFormat::Rgba8.to_wgpu(),
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    ctx.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255; 4],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
