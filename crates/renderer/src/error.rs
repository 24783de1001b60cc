use thiserror::Error;

use crate::shaders::ShaderStageKind;

/// Reasons the effect could not be mounted onto a surface.
///
/// None of these escape into the host as a panic: [`crate::mount_effect`]
/// logs them and leaves the surface inert.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The surface could not produce a hardware-accelerated drawing context.
    #[error("hardware-accelerated drawing context unavailable: {reason}")]
    ContextUnavailable { reason: String },
    /// One shader stage was rejected by the context's compiler.
    #[error("{stage} shader failed to compile: {diagnostic}")]
    ShaderCompile {
        stage: ShaderStageKind,
        diagnostic: String,
    },
    /// Both stages compiled but the program could not be linked.
    #[error("shader program failed to link: {diagnostic}")]
    ProgramLink { diagnostic: String },
}

/// Failures surfaced while presenting a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("drawing surface was lost")]
    SurfaceLost,
    #[error("drawing surface is outdated")]
    SurfaceOutdated,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("frame failed: {0}")]
    Other(String),
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(value: wgpu::SurfaceError) -> Self {
        match value {
            wgpu::SurfaceError::Lost => FrameError::SurfaceLost,
            wgpu::SurfaceError::Outdated => FrameError::SurfaceOutdated,
            wgpu::SurfaceError::Timeout => FrameError::Timeout,
            wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
            other => FrameError::Other(format!("{other:?}")),
        }
    }
}
