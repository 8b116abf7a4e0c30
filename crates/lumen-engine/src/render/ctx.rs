use anyhow::{Context, Result};

use crate::device::GpuErrorSink;

use super::blit::Blitter;
use super::RenderError;

/// Render-thread context: device, queue and the shared GPU helpers.
///
/// Every operation that touches GPU state takes `&RenderCtx`, which keeps GPU
/// work on the thread that owns it.
pub struct RenderCtx {
    device: wgpu::Device,
    queue: wgpu::Queue,
    errors: GpuErrorSink,
    blitter: Blitter,
}

impl RenderCtx {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let errors = GpuErrorSink::install(&device);
        let blitter = Blitter::new(&device);
        Self {
            device,
            queue,
            errors,
            blitter,
        }
    }

    /// Device without a surface, for offscreen rendering and tests.
    pub async fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self::new(device, queue))
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    pub fn errors(&self) -> &GpuErrorSink {
        &self.errors
    }

    #[inline]
    pub fn blitter(&self) -> &Blitter {
        &self.blitter
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Fails with the errors the device reported since the last check.
    pub fn check_errors(&self, stage: &'static str) -> Result<(), RenderError> {
        let errors = self.errors.drain();
        if errors.is_empty() {
            return Ok(());
        }
        Err(RenderError::Gpu {
            stage,
            message: errors.join("; "),
        })
    }
}
