//! Recording implementations of the device capabilities
//!
//! [`RecordingDevice`] and [`RecordingProgram`] log every command they
//! receive so draw sequences can be verified without a GPU.

use std::collections::VecDeque;

use crate::blend::BlendFunc;
use crate::device::{CompareFunc, Primitive, RenderDevice, ShaderProgram, StencilFace, StencilOp};
use crate::error::{ProgramError, Result};
use crate::geometry::Vertex;
use crate::texture::{DeviceTexture, ImageFlags, TextureId, TextureInfo, TextureKind};

/// One call made on a [`RecordingDevice`]
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCommand {
    Culling(bool),
    Blending(bool),
    DepthTest(bool),
    ScissorTest(bool),
    ColorMask(bool),
    StencilTest(bool),
    StencilMask(u32),
    StencilFunc(CompareFunc, i32, u32),
    StencilOp(StencilFace, StencilOp, StencilOp, StencilOp),
    BlendFunc(BlendFunc),
    UploadUniforms(usize),
    UploadVertices(usize),
    BindVertexInput,
    UnbindVertexInput,
    BindUniforms { offset: usize, size: usize },
    BindTexture(TextureId),
    Draw(Primitive, u32, u32),
}

/// A device that records commands instead of executing them
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub commands: Vec<DeviceCommand>,
    /// Value reported by [`RenderDevice::uniform_alignment`]
    pub alignment: usize,
    /// Last uploaded uniform bytes
    pub uniforms: Vec<u8>,
    /// Last uploaded vertices
    pub vertices: Vec<Vertex>,
    /// Errors handed out by [`RenderDevice::take_error`]
    pub pending_errors: VecDeque<String>,
    pub buffers_created: bool,
    pub fail_buffers: bool,
}

impl RecordingDevice {
    pub fn new(alignment: usize) -> Self {
        Self {
            alignment,
            ..Self::default()
        }
    }

    /// Every draw in order
    pub fn draws(&self) -> Vec<(Primitive, u32, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::Draw(p, first, count) => Some((*p, *first, *count)),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded commands matching `pred`
    pub fn count(&self, pred: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl RenderDevice for RecordingDevice {
    fn set_culling(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::Culling(enabled));
    }

    fn set_blending(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::Blending(enabled));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::DepthTest(enabled));
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::ScissorTest(enabled));
    }

    fn set_color_mask(&mut self, write: bool) {
        self.commands.push(DeviceCommand::ColorMask(write));
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::StencilTest(enabled));
    }

    fn set_stencil_mask(&mut self, mask: u32) {
        self.commands.push(DeviceCommand::StencilMask(mask));
    }

    fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        self.commands
            .push(DeviceCommand::StencilFunc(func, reference, mask));
    }

    fn set_stencil_op(&mut self, face: StencilFace, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.commands
            .push(DeviceCommand::StencilOp(face, fail, depth_fail, pass));
    }

    fn set_blend_func(&mut self, blend: BlendFunc) {
        self.commands.push(DeviceCommand::BlendFunc(blend));
    }

    fn upload_uniforms(&mut self, bytes: &[u8]) {
        self.uniforms = bytes.to_vec();
        self.commands.push(DeviceCommand::UploadUniforms(bytes.len()));
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        self.vertices = vertices.to_vec();
        self.commands
            .push(DeviceCommand::UploadVertices(vertices.len()));
    }

    fn bind_vertex_input(&mut self) {
        self.commands.push(DeviceCommand::BindVertexInput);
    }

    fn unbind_vertex_input(&mut self) {
        self.commands.push(DeviceCommand::UnbindVertexInput);
    }

    fn bind_uniforms(&mut self, offset: usize, size: usize) {
        self.commands
            .push(DeviceCommand::BindUniforms { offset, size });
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.commands.push(DeviceCommand::BindTexture(texture));
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        self.commands
            .push(DeviceCommand::Draw(primitive, first, count));
    }

    fn uniform_alignment(&self) -> usize {
        self.alignment
    }

    fn create_buffers(&mut self) -> Result<()> {
        if self.fail_buffers {
            return Err(crate::error::RendererError::Device("buffer creation disabled".into()));
        }
        self.buffers_created = true;
        Ok(())
    }

    fn take_error(&mut self) -> Option<String> {
        self.pending_errors.pop_front()
    }
}

/// One call made on a [`RecordingProgram`]
#[derive(Clone, Debug, PartialEq)]
pub enum ProgramCall {
    Compile(bool),
    ResolveUniformLocations,
    BindUniformBlock,
    Use,
    SetTextureUnitAndViewSize(u32, [f32; 2]),
    Release,
}

/// A program that records calls; compilation can be made to fail
#[derive(Debug, Default)]
pub struct RecordingProgram {
    pub calls: Vec<ProgramCall>,
    /// When set, `compile` fails with this info log
    pub compile_error: Option<String>,
}

impl RecordingProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(log: impl Into<String>) -> Self {
        Self {
            calls: Vec::new(),
            compile_error: Some(log.into()),
        }
    }
}

impl ShaderProgram for RecordingProgram {
    fn compile(&mut self, antialias: bool) -> std::result::Result<(), ProgramError> {
        self.calls.push(ProgramCall::Compile(antialias));
        match &self.compile_error {
            Some(log) => Err(ProgramError::Compile {
                stage: "fragment",
                log: log.clone(),
            }),
            None => Ok(()),
        }
    }

    fn resolve_uniform_locations(&mut self) {
        self.calls.push(ProgramCall::ResolveUniformLocations);
    }

    fn bind_uniform_block(&mut self) {
        self.calls.push(ProgramCall::BindUniformBlock);
    }

    fn use_program(&mut self) {
        self.calls.push(ProgramCall::Use);
    }

    fn set_texture_unit_and_view_size(&mut self, unit: u32, view: [f32; 2]) {
        self.calls
            .push(ProgramCall::SetTextureUnitAndViewSize(unit, view));
    }

    fn release(&mut self) {
        self.calls.push(ProgramCall::Release);
    }
}

/// CPU-side texture that records sub-rectangle updates
#[derive(Clone, Debug, PartialEq)]
pub struct TestTexture {
    pub info: TextureInfo,
    pub updates: Vec<(u32, u32, u32, u32)>,
}

impl TestTexture {
    pub fn new(width: u32, height: u32, kind: TextureKind, flags: ImageFlags) -> Self {
        Self {
            info: TextureInfo::new(width, height, kind, flags),
            updates: Vec::new(),
        }
    }

    pub fn rgba(width: u32, height: u32) -> Self {
        Self::new(width, height, TextureKind::Rgba, ImageFlags::NONE)
    }

    /// The 1×1 alpha placeholder
    pub fn placeholder() -> Self {
        Self::new(1, 1, TextureKind::Alpha, ImageFlags::NONE)
    }
}

impl DeviceTexture for TestTexture {
    fn info(&self) -> TextureInfo {
        self.info
    }

    fn update(&mut self, x: u32, y: u32, width: u32, height: u32, _data: &[u8]) {
        self.updates.push((x, y, width, height));
    }
}
