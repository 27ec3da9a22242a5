//! stencilvg: stencil-buffer vector path renderer core
//!
//! Turns a frame of already-tessellated fill, stroke and triangle
//! submissions into a short sequence of device draws. Self-intersecting
//! paths are resolved with the nonzero winding rule in the stencil buffer;
//! edges get anti-aliased fringes.
//!
//! # Frame flow
//!
//! Submissions pack their paint into a uniform slot and append vertices to
//! the frame's geometry arena, adding one [`DrawCall`] each. At flush the
//! [`Rasterizer`] walks the draw list once against a [`RenderDevice`], and
//! the frame is cleared for reuse.
//!
//! The device, the shader program and the textures are capabilities
//! supplied by a backend; see the `stencilvg_wgpu` crate for one built on
//! wgpu, and [`testing`] for recording implementations.

pub mod arena;
pub mod blend;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod paint;
pub mod rasterizer;
pub mod renderer;
pub mod testing;
pub mod texture;
pub mod uniforms;

pub use arena::GeometryArena;
pub use blend::{BlendFactor, BlendFunc, CompositeOperation, CompositeOperationState};
pub use config::{ArenaLimits, CreateFlags, RendererConfig};
pub use device::{CompareFunc, Primitive, RenderDevice, ShaderProgram, StencilFace, StencilOp};
pub use error::{PackError, ProgramError, RendererError, Result};
pub use frame::{CallKind, DrawCall, DrawData, Frame};
pub use geometry::{Bounds, PathSource, SubPath, Transform2D, Vertex};
pub use paint::{Color, Paint, Scissor};
pub use rasterizer::Rasterizer;
pub use renderer::Renderer;
pub use texture::{DeviceTexture, ImageFlags, TextureId, TextureInfo, TextureKind, TextureLookup, TextureRegistry};
pub use uniforms::{pack_paint, uniform_stride, FragUniforms, ShaderMode, TexType};
