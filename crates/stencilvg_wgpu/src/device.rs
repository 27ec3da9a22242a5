//! GL-style render device on wgpu
//!
//! State changes only update a shadow of the GL state. Each draw snapshots
//! that state into a [`PipelineKey`] plus the dynamic bits (stencil
//! reference, uniform offset, texture, vertex range). [`WgpuDevice::submit`]
//! replays the recorded draws in one render pass.
//!
//! Draws only ever refer to the buffers uploaded for their own frame: the
//! list is reset when a render binds its vertex input and after every
//! submit, successful or not.

use std::collections::VecDeque;
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use rustc_hash::FxHashMap;
use stencilvg::uniforms::FRAG_UNIFORMS_SIZE;
use stencilvg::{
    BlendFactor, BlendFunc, CompareFunc, Primitive, RenderDevice, RendererError, StencilFace,
    StencilOp, TextureId, TextureRegistry, Vertex,
};

use crate::config::WgpuConfig;
use crate::error::{Result, WgpuError};
use crate::pipeline::{create_pipeline, fan_indices, FaceOps, PipelineKey, PipelineTargets, StencilKey, Topology};
use crate::program::WgpuProgram;
use crate::texture::WgpuTexture;

const INITIAL_UNIFORM_BYTES: u64 = 64 * 1024;
const INITIAL_VERTEX_BYTES: u64 = 256 * 1024;
const INITIAL_INDEX_BYTES: u64 = 64 * 1024;

/// GL's initial blend function
const BLEND_REPLACE: BlendFunc = BlendFunc {
    src_rgb: BlendFactor::One,
    dst_rgb: BlendFactor::Zero,
    src_alpha: BlendFactor::One,
    dst_alpha: BlendFactor::Zero,
};

/// Shadow of the GL state the rasterizer drives
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceState {
    pub culling: bool,
    pub blending: bool,
    pub depth_test: bool,
    pub scissor_test: bool,
    pub color_write: bool,
    pub stencil_test: bool,
    pub stencil_write_mask: u32,
    pub stencil_compare: CompareFunc,
    pub stencil_ref: i32,
    pub stencil_read_mask: u32,
    pub front: FaceOps,
    pub back: FaceOps,
    pub blend: BlendFunc,
    pub uniform_offset: u32,
    pub texture: TextureId,
    pub vertex_input: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            culling: false,
            blending: false,
            depth_test: false,
            scissor_test: false,
            color_write: true,
            stencil_test: false,
            stencil_write_mask: 0xff,
            stencil_compare: CompareFunc::Always,
            stencil_ref: 0,
            stencil_read_mask: 0xff,
            front: FaceOps::default(),
            back: FaceOps::default(),
            blend: BLEND_REPLACE,
            uniform_offset: 0,
            texture: TextureId::NONE,
            vertex_input: false,
        }
    }
}

impl DeviceState {
    pub fn pipeline_key(&self, primitive: Primitive) -> PipelineKey {
        PipelineKey {
            topology: Topology::for_primitive(primitive),
            cull_back: self.culling,
            color_write: self.color_write,
            blend: self.blending.then_some(self.blend),
            stencil: self.stencil_test.then_some(StencilKey {
                compare: self.stencil_compare,
                front: self.front,
                back: self.back,
                read_mask: self.stencil_read_mask & 0xff,
                write_mask: self.stencil_write_mask & 0xff,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawRange {
    Vertices { first: u32, count: u32 },
    /// Range into the index buffer holding expanded fans
    Indices { first: u32, count: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordedDraw {
    pub key: PipelineKey,
    pub stencil_ref: u32,
    pub uniform_offset: u32,
    pub texture: TextureId,
    pub range: DrawRange,
}

/// Draws recorded for the current frame, with the index data of expanded fans
#[derive(Debug, Default)]
pub struct DrawList {
    draws: Vec<RecordedDraw>,
    indices: Vec<u32>,
}

impl DrawList {
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn clear(&mut self) {
        self.draws.clear();
        self.indices.clear();
    }

    /// Record a draw against `state`. Fans shorter than a triangle and empty
    /// ranges are dropped.
    pub fn record(&mut self, state: &DeviceState, primitive: Primitive, first: u32, count: u32) {
        let range = match primitive {
            Primitive::TriangleFan => {
                if count < 3 {
                    return;
                }
                let start = self.indices.len() as u32;
                fan_indices(first, count, &mut self.indices);
                DrawRange::Indices {
                    first: start,
                    count: self.indices.len() as u32 - start,
                }
            }
            Primitive::TriangleStrip | Primitive::Triangles => {
                if count == 0 {
                    return;
                }
                DrawRange::Vertices { first, count }
            }
        };

        self.draws.push(RecordedDraw {
            key: state.pipeline_key(primitive),
            stencil_ref: (state.stencil_ref as u32) & 0xff,
            uniform_offset: state.uniform_offset,
            texture: state.texture,
            range,
        });
    }
}

/// Grow `buffer` to hold at least `size` bytes
fn ensure_capacity(
    device: &wgpu::Device,
    buffer: &mut wgpu::Buffer,
    size: u64,
    usage: wgpu::BufferUsages,
    label: &'static str,
) {
    if buffer.size() >= size {
        return;
    }
    let new_size = size.next_power_of_two();
    tracing::debug!("growing {} from {} to {} bytes", label, buffer.size(), new_size);
    *buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: new_size,
        usage,
        mapped_at_creation: false,
    });
}

struct Buffers {
    uniforms: wgpu::Buffer,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

const UNIFORM_USAGE: wgpu::BufferUsages =
    wgpu::BufferUsages::UNIFORM.union(wgpu::BufferUsages::COPY_DST);
const VERTEX_USAGE: wgpu::BufferUsages =
    wgpu::BufferUsages::VERTEX.union(wgpu::BufferUsages::COPY_DST);
const INDEX_USAGE: wgpu::BufferUsages =
    wgpu::BufferUsages::INDEX.union(wgpu::BufferUsages::COPY_DST);

pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: WgpuConfig,
    state: DeviceState,
    buffers: Option<Buffers>,
    list: DrawList,
    pipelines: LruCache<PipelineKey, Arc<wgpu::RenderPipeline>>,
    pipelines_created: usize,
    errors: Arc<Mutex<VecDeque<String>>>,
}

impl WgpuDevice {
    /// Wrap `device` for rendering.
    ///
    /// With `capture_errors` set this installs an uncaptured error handler
    /// on `device`, replacing any handler the caller registered.
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, config: WgpuConfig) -> Self {
        let errors = Arc::new(Mutex::new(VecDeque::new()));
        if config.capture_errors {
            let sink = Arc::clone(&errors);
            device.on_uncaptured_error(Box::new(move |e: wgpu::Error| {
                if let Ok(mut queue) = sink.lock() {
                    queue.push_back(e.to_string());
                }
            }));
        }
        let capacity = NonZeroUsize::new(config.pipeline_cache_size).unwrap_or(NonZeroUsize::MIN);

        Self {
            device,
            queue,
            config,
            state: DeviceState::default(),
            buffers: None,
            list: DrawList::default(),
            pipelines: LruCache::new(capacity),
            pipelines_created: 0,
            errors,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Draws recorded for the current frame
    pub fn draws(&self) -> &[RecordedDraw] {
        self.list.draws()
    }

    /// Drop the draws recorded so far without submitting them
    pub fn discard_draws(&mut self) {
        if !self.list.is_empty() {
            tracing::debug!("discarding {} unsubmitted draws", self.list.draws().len());
        }
        self.list.clear();
    }

    /// Pipelines currently cached
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Pipelines created over the device's lifetime
    pub fn pipelines_created(&self) -> usize {
        self.pipelines_created
    }

    pub fn config(&self) -> &WgpuConfig {
        &self.config
    }

    /// Look up or create the pipelines the recorded draws need
    fn resolve_pipelines(
        &mut self,
        targets: &PipelineTargets<'_>,
    ) -> FxHashMap<PipelineKey, Arc<wgpu::RenderPipeline>> {
        let mut frame_pipelines = FxHashMap::default();
        for draw in self.list.draws() {
            if frame_pipelines.contains_key(&draw.key) {
                continue;
            }
            let pipeline = match self.pipelines.get(&draw.key) {
                Some(p) => Arc::clone(p),
                None => {
                    let p = Arc::new(create_pipeline(&self.device, targets, &draw.key));
                    self.pipelines_created += 1;
                    self.pipelines.put(draw.key, Arc::clone(&p));
                    p
                }
            };
            frame_pipelines.insert(draw.key, pipeline);
        }
        frame_pipelines
    }

    /// Encode and submit the recorded draws into `target`.
    ///
    /// The stencil attachment is cleared to zero at the start of the pass.
    /// Color is loaded, so the caller owns clearing the target. The draw
    /// list is empty afterwards, also when an error is returned.
    pub fn submit(
        &mut self,
        program: &WgpuProgram,
        textures: &TextureRegistry<WgpuTexture>,
        target: &wgpu::TextureView,
        stencil: &wgpu::TextureView,
    ) -> Result<()> {
        let result = self.encode(program, textures, target, stencil);
        self.list.clear();
        result
    }

    fn encode(
        &mut self,
        program: &WgpuProgram,
        textures: &TextureRegistry<WgpuTexture>,
        target: &wgpu::TextureView,
        stencil: &wgpu::TextureView,
    ) -> Result<()> {
        if self.list.is_empty() {
            return Ok(());
        }
        let (Some(layout), Some(module), Some(view_buffer)) = (
            program.pipeline_layout(),
            program.module(),
            program.view_buffer(),
        ) else {
            return Err(WgpuError::ProgramNotReady);
        };

        let targets = PipelineTargets {
            layout,
            module,
            color_format: self.config.color_format,
            stencil_format: self.config.stencil_format,
        };
        let pipelines = self.resolve_pipelines(&targets);

        let Some(buffers) = self.buffers.as_mut() else {
            return Err(WgpuError::Renderer(RendererError::Device(
                "buffers were not created".to_string(),
            )));
        };
        if !self.list.indices().is_empty() {
            let bytes: &[u8] = bytemuck::cast_slice(self.list.indices());
            ensure_capacity(
                &self.device,
                &mut buffers.indices,
                bytes.len() as u64,
                INDEX_USAGE,
                "stencilvg indices",
            );
            self.queue.write_buffer(&buffers.indices, 0, bytes);
        }

        let uniform_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stencilvg uniforms"),
            layout: program.uniform_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffers.uniforms,
                        offset: 0,
                        size: NonZeroU64::new(FRAG_UNIFORMS_SIZE as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: view_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stencilvg frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stencilvg pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: stencil,
                    depth_ops: None,
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Discard,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_vertex_buffer(0, buffers.vertices.slice(..));
            if !self.list.indices().is_empty() {
                pass.set_index_buffer(buffers.indices.slice(..), wgpu::IndexFormat::Uint32);
            }

            let mut last_key: Option<PipelineKey> = None;
            let mut last_ref: Option<u32> = None;
            let mut last_texture: Option<TextureId> = None;

            for draw in self.list.draws() {
                let Some(pipeline) = pipelines.get(&draw.key) else {
                    continue;
                };
                let texture = textures
                    .find(textures.resolve(draw.texture))
                    .or_else(|| textures.find(textures.fallback()));
                let Some(texture) = texture else {
                    tracing::warn!("no texture for draw, skipping");
                    continue;
                };

                if last_key != Some(draw.key) {
                    pass.set_pipeline(pipeline);
                    last_key = Some(draw.key);
                }
                if last_ref != Some(draw.stencil_ref) {
                    pass.set_stencil_reference(draw.stencil_ref);
                    last_ref = Some(draw.stencil_ref);
                }
                pass.set_bind_group(0, &uniform_group, &[draw.uniform_offset]);
                if last_texture != Some(draw.texture) {
                    pass.set_bind_group(1, texture.bind_group(), &[]);
                    last_texture = Some(draw.texture);
                }

                match draw.range {
                    DrawRange::Vertices { first, count } => pass.draw(first..first + count, 0..1),
                    DrawRange::Indices { first, count } => {
                        pass.draw_indexed(first..first + count, 0, 0..1)
                    }
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        tracing::trace!("submitted {} draws", self.list.draws().len());
        Ok(())
    }
}

impl RenderDevice for WgpuDevice {
    fn set_culling(&mut self, enabled: bool) {
        self.state.culling = enabled;
    }

    fn set_blending(&mut self, enabled: bool) {
        self.state.blending = enabled;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        if enabled {
            tracing::debug!("depth test requested, the stencil attachment has no depth aspect");
        }
        self.state.depth_test = enabled;
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        self.state.scissor_test = enabled;
    }

    fn set_color_mask(&mut self, write: bool) {
        self.state.color_write = write;
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.state.stencil_test = enabled;
    }

    fn set_stencil_mask(&mut self, mask: u32) {
        self.state.stencil_write_mask = mask;
    }

    fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        self.state.stencil_compare = func;
        self.state.stencil_ref = reference;
        self.state.stencil_read_mask = mask;
    }

    fn set_stencil_op(&mut self, face: StencilFace, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        let ops = FaceOps {
            fail,
            depth_fail,
            pass,
        };
        match face {
            StencilFace::Front => self.state.front = ops,
            StencilFace::Back => self.state.back = ops,
            StencilFace::FrontAndBack => {
                self.state.front = ops;
                self.state.back = ops;
            }
        }
    }

    fn set_blend_func(&mut self, blend: BlendFunc) {
        self.state.blend = blend;
    }

    fn upload_uniforms(&mut self, bytes: &[u8]) {
        let Some(buffers) = self.buffers.as_mut() else {
            tracing::warn!("uniform upload before buffers were created");
            return;
        };
        if bytes.is_empty() {
            return;
        }
        ensure_capacity(
            &self.device,
            &mut buffers.uniforms,
            bytes.len() as u64,
            UNIFORM_USAGE,
            "stencilvg uniforms",
        );
        self.queue.write_buffer(&buffers.uniforms, 0, bytes);
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        let Some(buffers) = self.buffers.as_mut() else {
            tracing::warn!("vertex upload before buffers were created");
            return;
        };
        if vertices.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        ensure_capacity(
            &self.device,
            &mut buffers.vertices,
            bytes.len() as u64,
            VERTEX_USAGE,
            "stencilvg vertices",
        );
        self.queue.write_buffer(&buffers.vertices, 0, bytes);
    }

    fn bind_vertex_input(&mut self) {
        // A render starts here, after its uploads replaced the buffers
        self.discard_draws();
        self.state.vertex_input = true;
    }

    fn unbind_vertex_input(&mut self) {
        self.state.vertex_input = false;
    }

    fn bind_uniforms(&mut self, offset: usize, size: usize) {
        if size != FRAG_UNIFORMS_SIZE {
            tracing::warn!("uniform binding of {} bytes, expected {}", size, FRAG_UNIFORMS_SIZE);
        }
        self.state.uniform_offset = offset as u32;
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.state.texture = texture;
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        if !self.state.vertex_input {
            tracing::warn!("draw without vertex input bound, skipping");
            return;
        }
        self.list.record(&self.state, primitive, first, count);
    }

    fn uniform_alignment(&self) -> usize {
        self.device.limits().min_uniform_buffer_offset_alignment as usize
    }

    fn create_buffers(&mut self) -> stencilvg::Result<()> {
        let create = |size: u64, usage: wgpu::BufferUsages, label: &'static str| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        };
        self.buffers = Some(Buffers {
            uniforms: create(INITIAL_UNIFORM_BYTES, UNIFORM_USAGE, "stencilvg uniforms"),
            vertices: create(INITIAL_VERTEX_BYTES, VERTEX_USAGE, "stencilvg vertices"),
            indices: create(INITIAL_INDEX_BYTES, INDEX_USAGE, "stencilvg indices"),
        });
        Ok(())
    }

    fn take_error(&mut self) -> Option<String> {
        self.errors.lock().ok()?.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_matches_gl() {
        let state = DeviceState::default();
        assert!(state.color_write);
        assert!(!state.stencil_test);
        assert_eq!(state.stencil_write_mask, 0xff);
        assert_eq!(state.blend, BLEND_REPLACE);
    }

    #[test]
    fn key_reflects_enabled_state() {
        let mut state = DeviceState::default();
        let key = state.pipeline_key(Primitive::TriangleStrip);
        assert_eq!(key.topology, Topology::Strip);
        assert_eq!(key.blend, None);
        assert_eq!(key.stencil, None);

        state.blending = true;
        state.blend = BlendFunc::PREMULTIPLIED_OVER;
        state.stencil_test = true;
        state.stencil_compare = CompareFunc::NotEqual;
        state.front.pass = StencilOp::Zero;
        state.stencil_read_mask = 0xffff_ffff;
        let key = state.pipeline_key(Primitive::TriangleFan);
        assert_eq!(key.topology, Topology::List);
        assert_eq!(key.blend, Some(BlendFunc::PREMULTIPLIED_OVER));
        let stencil = key.stencil.unwrap();
        assert_eq!(stencil.compare, CompareFunc::NotEqual);
        assert_eq!(stencil.front.pass, StencilOp::Zero);
        assert_eq!(stencil.read_mask, 0xff);
    }

    #[test]
    fn short_fans_and_empty_ranges_are_dropped() {
        let state = DeviceState::default();
        let mut list = DrawList::default();
        list.record(&state, Primitive::TriangleFan, 0, 2);
        list.record(&state, Primitive::TriangleStrip, 4, 0);
        assert!(list.is_empty());
        assert!(list.indices().is_empty());

        list.record(&state, Primitive::TriangleFan, 4, 4);
        assert_eq!(list.draws()[0].range, DrawRange::Indices { first: 0, count: 6 });
        assert_eq!(list.indices(), &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn cleared_list_starts_a_fresh_frame() {
        let mut state = DeviceState::default();
        let mut list = DrawList::default();
        state.uniform_offset = 512;
        list.record(&state, Primitive::TriangleFan, 10, 5);
        list.record(&state, Primitive::TriangleStrip, 15, 4);

        list.clear();
        state.uniform_offset = 0;
        list.record(&state, Primitive::TriangleFan, 0, 3);
        assert_eq!(list.draws().len(), 1);
        assert_eq!(list.draws()[0].uniform_offset, 0);
        assert_eq!(list.draws()[0].range, DrawRange::Indices { first: 0, count: 3 });
        assert_eq!(list.indices(), &[0, 1, 2]);
    }

    #[test]
    fn stencil_reference_does_not_split_keys() {
        let mut a = DeviceState::default();
        a.stencil_test = true;
        let mut b = a;
        b.stencil_ref = 1;
        assert_eq!(
            a.pipeline_key(Primitive::Triangles),
            b.pipeline_key(Primitive::Triangles)
        );
    }
}
