//! Capabilities the rasterizer drives
//!
//! [`RenderDevice`] is a GL-style immediate state machine: state toggles
//! and draws are issued in order and take effect for the draws that follow.
//! [`ShaderProgram`] is the compiled shader the draws run with.

use crate::blend::BlendFunc;
use crate::error::{ProgramError, Result};
use crate::geometry::Vertex;
use crate::texture::TextureId;

/// Stencil comparison function
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Always,
    Equal,
    NotEqual,
}

/// Stencil update operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    /// Increment, clamping at the maximum
    Incr,
    IncrWrap,
    DecrWrap,
}

/// Which polygon faces a stencil operation applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilFace {
    Front,
    Back,
    FrontAndBack,
}

/// Vertex assembly for [`RenderDevice::draw_arrays`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    TriangleFan,
    TriangleStrip,
    Triangles,
}

/// GL-style render state and draw submission
pub trait RenderDevice {
    /// Toggle back-face culling. Front faces wind counter-clockwise.
    fn set_culling(&mut self, enabled: bool);
    fn set_blending(&mut self, enabled: bool);
    fn set_depth_test(&mut self, enabled: bool);
    fn set_scissor_test(&mut self, enabled: bool);
    /// Enable or disable writes to every color channel
    fn set_color_mask(&mut self, write: bool);
    fn set_stencil_test(&mut self, enabled: bool);
    fn set_stencil_mask(&mut self, mask: u32);
    fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32);
    fn set_stencil_op(&mut self, face: StencilFace, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);
    fn set_blend_func(&mut self, blend: BlendFunc);

    /// Replace the device uniform buffer with `bytes`
    fn upload_uniforms(&mut self, bytes: &[u8]);
    /// Replace the device vertex buffer with `vertices`
    fn upload_vertices(&mut self, vertices: &[Vertex]);
    fn bind_vertex_input(&mut self);
    fn unbind_vertex_input(&mut self);

    /// Bind the `size` bytes at `offset` of the uniform buffer as the
    /// fragment uniform block.
    fn bind_uniforms(&mut self, offset: usize, size: usize);
    /// Bind a texture to unit 0; [`TextureId::NONE`] unbinds.
    fn bind_texture(&mut self, texture: TextureId);

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);

    /// Required byte alignment of uniform buffer binding offsets
    fn uniform_alignment(&self) -> usize;

    /// Create the vertex and uniform buffers used by every frame
    fn create_buffers(&mut self) -> Result<()>;

    /// Pop the oldest pending device error, if any
    fn take_error(&mut self) -> Option<String> {
        None
    }
}

/// The compiled shader program
pub trait ShaderProgram {
    /// Compile and link; `antialias` selects the edge anti-aliasing variant.
    fn compile(&mut self, antialias: bool) -> std::result::Result<(), ProgramError>;
    fn resolve_uniform_locations(&mut self);
    /// Attach the fragment uniform block to its binding point
    fn bind_uniform_block(&mut self);
    fn use_program(&mut self);
    fn set_texture_unit_and_view_size(&mut self, unit: u32, view: [f32; 2]);
    /// Unbind the program after a frame
    fn release(&mut self);
}
