//! Error types

use thiserror::Error;

use crate::texture::TextureId;

/// Paint packing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    /// The paint references an image handle that is not registered
    #[error("image {0} is not a registered texture")]
    UnknownImage(TextureId),
}

/// Shader program failures, carrying the driver's info log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// A shader stage failed to compile
    #[error("shader {stage} compile error:\n{log}")]
    Compile { stage: &'static str, log: String },

    /// The program failed to link
    #[error("program link error:\n{0}")]
    Link(String),
}

/// Backend initialization failures
#[derive(Error, Debug)]
pub enum RendererError {
    /// Shader compilation or link error
    #[error(transparent)]
    Program(#[from] ProgramError),

    /// Device resources could not be created
    #[error("device initialization failed: {0}")]
    Device(String),
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, RendererError>;
