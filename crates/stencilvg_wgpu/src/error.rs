//! Backend error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WgpuError {
    /// No adapter matched the request
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error(transparent)]
    Renderer(#[from] stencilvg::RendererError),

    /// A draw was encoded before the program compiled
    #[error("shader program has not been compiled")]
    ProgramNotReady,

    /// Texture readback failed
    #[error("readback failed: {0}")]
    Readback(String),
}

pub type Result<T> = std::result::Result<T, WgpuError>;
