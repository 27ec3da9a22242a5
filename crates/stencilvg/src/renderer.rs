//! Backend context
//!
//! [`Renderer`] owns a device, a shader program, the texture registry, the
//! current frame and the rasterizer, and exposes the per-frame submission
//! API on top of them.

use crate::blend::CompositeOperationState;
use crate::config::{log_renderer_config, RendererConfig};
use crate::device::{RenderDevice, ShaderProgram};
use crate::error::Result;
use crate::frame::Frame;
use crate::geometry::{Bounds, PathSource, Vertex};
use crate::paint::{Paint, Scissor};
use crate::rasterizer::Rasterizer;
use crate::texture::{DeviceTexture, TextureId, TextureRegistry};
use crate::uniforms::uniform_stride;

pub struct Renderer<D, P, X> {
    device: D,
    program: P,
    textures: TextureRegistry<X>,
    frame: Frame,
    rasterizer: Rasterizer,
    config: RendererConfig,
}

impl<D, P, X> Renderer<D, P, X>
where
    D: RenderDevice,
    P: ShaderProgram,
    X: DeviceTexture,
{
    /// Compile the program and create device resources.
    ///
    /// A shader compile or link failure is returned with the driver's info
    /// log; there is no degraded mode.
    pub fn new(mut device: D, mut program: P, textures: TextureRegistry<X>, config: RendererConfig) -> Result<Self> {
        log_renderer_config(&config);

        if let Err(e) = program.compile(config.antialias) {
            tracing::error!("{}", e);
            return Err(e.into());
        }
        program.resolve_uniform_locations();
        device.create_buffers()?;
        program.bind_uniform_block();

        let stride = uniform_stride(device.uniform_alignment());
        tracing::debug!(
            "uniform stride {} (alignment {})",
            stride,
            device.uniform_alignment()
        );

        Ok(Self {
            device,
            program,
            textures,
            frame: Frame::new(&config, stride),
            rasterizer: Rasterizer::new(&config),
            config,
        })
    }

    pub fn set_viewport(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        self.frame.set_viewport(width, height, device_pixel_ratio);
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
        self.frame
            .submit_fill(&self.textures, paint, composite, scissor, fringe, bounds, paths)
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
        self.frame
            .submit_stroke(&self.textures, paint, composite, scissor, fringe, stroke_width, paths)
    }

    pub fn submit_triangles(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        vertices: &[Vertex],
        fringe: f32,
    ) -> bool {
        self.frame
            .submit_triangles(&self.textures, paint, composite, scissor, vertices, fringe)
    }

    /// Render the frame, if it has any calls, and clear it.
    pub fn flush(&mut self) {
        let data = self.frame.draw_data();
        self.rasterizer
            .render(&mut self.device, &mut self.program, &self.textures, &data);
        self.frame.clear();
    }

    /// Drop the frame's submissions without rendering
    pub fn cancel(&mut self) {
        self.frame.cancel();
    }

    pub fn create_texture(&mut self, texture: X) -> TextureId {
        self.textures.register(texture)
    }

    pub fn update_texture(&mut self, id: TextureId, x: u32, y: u32, width: u32, height: u32, data: &[u8]) -> bool {
        self.textures.update(id, x, y, width, height, data)
    }

    pub fn delete_texture(&mut self, id: TextureId) -> bool {
        self.textures.delete(id)
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.texture_size(id)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn textures(&self) -> &TextureRegistry<X> {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureRegistry<X> {
        &mut self.textures
    }

    /// Device, program and textures borrowed together, for backends that
    /// encode recorded commands after a flush.
    pub fn parts_mut(&mut self) -> (&mut D, &P, &TextureRegistry<X>) {
        (&mut self.device, &self.program, &self.textures)
    }
}
