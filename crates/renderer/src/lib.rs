//! Renderer crate for Grid Shade, a full-surface pointer-reactive grid effect.
//!
//! A fragment shader draws a fine grid over the whole window. Lines are only
//! visible near the pointer, thicken and soften as it approaches, and bend
//! toward it. A second, smoothed copy of the pointer trails the real one and
//! drives line weight, so the grid reacts with a little inertia.
//!
//! ```text
//!   gridshade CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ RenderSession::frame()
//!                            │                  │
//!                            │                  ├─▶ PointerState::advance()
//!                            │                  └─▶ GraphicsContext::draw() ─▶ wgpu
//!                            └─▶ resize / pointer events ─▶ RenderSession
//! ```
//!
//! [`RenderSession`] owns all per-mount state and talks to the GPU through the
//! [`GraphicsContext`] trait. [`WgpuContext`] is the production implementation;
//! the effect's maths is mirrored on the CPU in [`effect`] for inspection.

mod backend;
pub mod effect;
mod error;
mod geometry;
mod gpu;
mod pipeline;
mod pointer;
mod session;
mod shaders;
mod types;
mod window;

use anyhow::Result;

pub use backend::{
    ComponentType, DrawCall, GraphicsContext, PrimitiveTopology, VertexAttributeLayout, Viewport,
    CLEAR_WHITE,
};
pub use error::{FrameError, SetupError};
pub use geometry::{setup_geometry, GeometryBuffer, QUAD_VERTEX_COUNT, QUAD_VERTICES};
pub use gpu::{WgpuBuffer, WgpuContext, WgpuProgram, WgpuStage, WgpuUniformLocation};
pub use pipeline::{build_pipeline, GridProgram};
pub use pointer::{Point, PointerState, SMOOTHING_FACTOR};
pub use session::{
    mount_effect, FrameScheduler, FrameStatus, RenderSession, StopHandle, SurfaceHost,
    ViewportState,
};
pub use shaders::{
    grid_fragment_source, grid_vertex_source, ShaderSource, ShaderStageKind,
    DELAYED_MOUSE_UNIFORM, MOUSE_UNIFORM, POSITION_ATTRIBUTE, RESOLUTION_UNIFORM,
};
pub use types::{GpuPowerPreference, RendererConfig};

/// Entry point that owns the configuration and opens the window.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    /// Builds a renderer for the supplied configuration.
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and runs the effect until the window closes or the
    /// frame limit is reached.
    ///
    /// Fails only when the window system itself is unavailable; a GPU or
    /// shader failure leaves the window blank and is logged instead.
    pub fn run(&mut self) -> Result<()> {
        window::run_window(&self.config)
    }
}
