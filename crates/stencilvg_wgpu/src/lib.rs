//! wgpu backend for stencilvg
//!
//! Implements the core's device, program and texture capabilities on wgpu.
//! The GL-style state the rasterizer drives is folded into cached render
//! pipelines, and each flush is encoded as a single render pass against the
//! caller's color target and an internally owned stencil attachment.
//!
//! ```ignore
//! let mut renderer = pollster::block_on(WgpuRenderer::headless(
//!     RendererConfig::default(),
//!     WgpuConfig::default(),
//! ))?;
//! renderer.set_viewport(256.0, 256.0, 1.0);
//! renderer.submit_fill(&paint, composite, &Scissor::none(), 1.0, bounds, &paths);
//! renderer.flush(&target_view, (256, 256))?;
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod program;
pub mod renderer;
pub mod shader;
pub mod texture;

pub use config::WgpuConfig;
pub use device::{DeviceState, DrawList, DrawRange, RecordedDraw, WgpuDevice};
pub use error::{Result, WgpuError};
pub use pipeline::{PipelineKey, StencilKey, Topology};
pub use program::WgpuProgram;
pub use renderer::{request_device, CoreRenderer, WgpuRenderer};
pub use shader::shader_source;
pub use texture::WgpuTexture;
