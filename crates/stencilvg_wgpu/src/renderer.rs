//! wgpu renderer
//!
//! [`WgpuRenderer`] assembles the core [`Renderer`] with the wgpu device,
//! program and textures, and owns the stencil attachment the passes draw
//! against.

use std::sync::{mpsc, Arc};

use stencilvg::{
    Bounds, CompositeOperationState, ImageFlags, Paint, PathSource, Renderer, RendererConfig,
    Scissor, TextureId, TextureInfo, TextureKind, Vertex,
};

use crate::config::{log_wgpu_config, WgpuConfig};
use crate::device::WgpuDevice;
use crate::error::{Result, WgpuError};
use crate::program::WgpuProgram;
use crate::texture::WgpuTexture;

pub type CoreRenderer = Renderer<WgpuDevice, WgpuProgram, WgpuTexture>;

struct StencilTarget {
    view: wgpu::TextureView,
    size: (u32, u32),
}

fn preferred_backends() -> wgpu::Backends {
    #[cfg(target_os = "macos")]
    {
        wgpu::Backends::METAL
    }
    #[cfg(target_os = "windows")]
    {
        wgpu::Backends::DX12
    }
    #[cfg(target_os = "linux")]
    {
        wgpu::Backends::VULKAN | wgpu::Backends::GL
    }
    #[cfg(target_arch = "wasm32")]
    {
        wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL
    }
    #[cfg(not(any(
        target_os = "macos",
        target_os = "windows",
        target_os = "linux",
        target_arch = "wasm32"
    )))]
    {
        wgpu::Backends::PRIMARY
    }
}

/// Request a device and queue without a surface
pub async fn request_device() -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: preferred_backends(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(WgpuError::AdapterNotFound)?;
    tracing::debug!("adapter: {:?}", adapter.get_info());

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("stencilvg device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        )
        .await?;

    Ok((Arc::new(device), Arc::new(queue)))
}

pub struct WgpuRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    renderer: CoreRenderer,
    stencil: Option<StencilTarget>,
    config: WgpuConfig,
}

impl WgpuRenderer {
    /// Build the renderer on an existing device.
    ///
    /// Debug mode turns on error capture so device errors are reported per
    /// draw instead of reaching wgpu's default handler. Capturing installs
    /// an uncaptured error handler on `device`, which replaces any handler
    /// registered on it before.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        config: RendererConfig,
        mut wgpu_config: WgpuConfig,
    ) -> Result<Self> {
        if config.debug {
            wgpu_config.capture_errors = true;
        }
        log_wgpu_config(&wgpu_config);

        let program = WgpuProgram::new(Arc::clone(&device), Arc::clone(&queue));
        let fallback = WgpuTexture::dummy(&device, Arc::clone(&queue), program.texture_layout());
        let textures = stencilvg::TextureRegistry::with_fallback(fallback);
        let render_device = WgpuDevice::new(Arc::clone(&device), Arc::clone(&queue), wgpu_config.clone());

        let renderer = Renderer::new(render_device, program, textures, config)?;

        Ok(Self {
            device,
            queue,
            renderer,
            stencil: None,
            config: wgpu_config,
        })
    }

    /// Request a device of its own and build the renderer on it
    pub async fn headless(config: RendererConfig, wgpu_config: WgpuConfig) -> Result<Self> {
        let (device, queue) = request_device().await?;
        Self::new(device, queue, config, wgpu_config)
    }

    pub fn set_viewport(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        self.renderer.set_viewport(width, height, device_pixel_ratio);
    }

    pub fn submit_fill(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        bounds: Bounds,
        paths: &[PathSource<'_>],
    ) -> bool {
        self.renderer
            .submit_fill(paint, composite, scissor, fringe, bounds, paths)
    }

    pub fn submit_stroke(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: &[PathSource<'_>],
    ) -> bool {
        self.renderer
            .submit_stroke(paint, composite, scissor, fringe, stroke_width, paths)
    }

    pub fn submit_triangles(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        vertices: &[Vertex],
        fringe: f32,
    ) -> bool {
        self.renderer
            .submit_triangles(paint, composite, scissor, vertices, fringe)
    }

    /// Render the frame into `target` and clear it.
    ///
    /// `size` is the target's pixel size; the stencil attachment is
    /// recreated when it changes.
    pub fn flush(&mut self, target: &wgpu::TextureView, size: (u32, u32)) -> Result<()> {
        self.ensure_stencil(size);
        // Draws left by a flush through `renderer_mut` refer to buffers this
        // frame overwrites
        self.renderer.device_mut().discard_draws();
        self.renderer.flush();

        let Some(stencil) = &self.stencil else {
            return Ok(());
        };
        let (device, program, textures) = self.renderer.parts_mut();
        device.submit(program, textures, target, &stencil.view)
    }

    /// Drop the frame's submissions
    pub fn cancel(&mut self) {
        self.renderer.cancel();
    }

    fn ensure_stencil(&mut self, size: (u32, u32)) {
        let size = (size.0.max(1), size.1.max(1));
        if self.stencil.as_ref().is_some_and(|s| s.size == size) {
            return;
        }
        tracing::debug!("creating {}x{} stencil attachment", size.0, size.1);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stencilvg stencil"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.stencil_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.stencil = Some(StencilTarget { view, size });
    }

    /// Create a texture, optionally initialized with tightly packed pixel rows
    pub fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        kind: TextureKind,
        flags: ImageFlags,
        data: Option<&[u8]>,
    ) -> TextureId {
        let info = TextureInfo::new(width, height, kind, flags);
        let texture = WgpuTexture::new(
            &self.device,
            Arc::clone(&self.queue),
            self.renderer.program().texture_layout(),
            info,
            data,
        );
        self.renderer.create_texture(texture)
    }

    /// Register a texture created elsewhere, `None` for unsupported formats
    pub fn wrap_texture(&mut self, texture: wgpu::Texture, flags: ImageFlags) -> Option<TextureId> {
        let texture = WgpuTexture::wrap(
            &self.device,
            Arc::clone(&self.queue),
            self.renderer.program().texture_layout(),
            texture,
            flags,
        )?;
        Some(self.renderer.create_texture(texture))
    }

    pub fn update_texture(&mut self, id: TextureId, x: u32, y: u32, width: u32, height: u32, data: &[u8]) -> bool {
        self.renderer.update_texture(id, x, y, width, height, data)
    }

    pub fn delete_texture(&mut self, id: TextureId) -> bool {
        self.renderer.delete_texture(id)
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.renderer.texture_size(id)
    }

    pub fn renderer(&self) -> &CoreRenderer {
        &self.renderer
    }

    /// The core renderer. Its own `flush` records draws without submitting
    /// them; they are dropped by the next [`flush`](Self::flush).
    pub fn renderer_mut(&mut self) -> &mut CoreRenderer {
        &mut self.renderer
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn config(&self) -> &WgpuConfig {
        &self.config
    }

    pub fn pipeline_count(&self) -> usize {
        self.renderer.device().pipeline_count()
    }

    /// Copy an RGBA8 texture back to the CPU as tightly packed rows
    pub fn read_texture_rgba(&self, texture: &wgpu::Texture) -> Result<Vec<u8>> {
        let width = texture.width();
        let height = texture.height();
        let row_bytes = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = row_bytes.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stencilvg readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stencilvg readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| WgpuError::Readback(e.to_string()))?
            .map_err(|e| WgpuError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((row_bytes * height) as usize);
        for row in mapped.chunks(padded_row as usize).take(height as usize) {
            pixels.extend_from_slice(&row[..row_bytes as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }
}
