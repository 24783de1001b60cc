//! wgpu implementation of the drawing-context seam.
//!
//! - `context` owns wgpu instance/device/surface wiring and rebuilds the
//!   swapchain when the window resizes.
//! - `reflect` runs GLSL through naga to validate stages and derive the
//!   attribute locations and uniform offsets a linked program exposes.
//! - `program` turns two checked stages into a triangle-strip pipeline plus
//!   the uniform buffer it reads.
//! - `state` glues everything together as [`WgpuContext`].

mod context;
mod program;
mod reflect;
mod state;

pub use program::WgpuStage;
pub use state::{WgpuBuffer, WgpuContext, WgpuProgram, WgpuUniformLocation};
