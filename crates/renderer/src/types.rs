use std::fmt;

/// Adapter selection hint forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Prefer integrated / power-saving adapters.
    Low,
    /// Prefer discrete / high-performance adapters.
    #[default]
    High,
}

impl fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// The effect itself (shader text, smoothing factor, grid constants) is fixed
/// at build time; this only shapes the host window and GPU selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Stop the loop after this many presented frames; `None` runs until the
    /// window closes.
    pub max_frames: Option<u64>,
    pub power_preference: GpuPowerPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "Grid Shade".to_string(),
            max_frames: None,
            power_preference: GpuPowerPreference::default(),
        }
    }
}
