//! Error types for the presentation stage.

use thiserror::Error;

/// Errors that can occur while presenting.
#[derive(Debug, Error)]
pub enum PresentError {
    /// Shader compilation or linking failed.
    #[error("Shader compilation failed: {0}")]
    ShaderCompile(String),

    /// Texture allocation failed.
    #[error("Texture allocation failed: {0}")]
    TextureAllocation(String),

    /// Present was called before the surface was created.
    #[error("Presentation stage not initialized")]
    NotInitialized,
}
