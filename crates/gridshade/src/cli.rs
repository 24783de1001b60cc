use clap::Parser;
use renderer::GpuPowerPreference;

#[derive(Parser, Debug)]
#[command(
    name = "gridshade",
    author,
    version,
    about = "Full-window grid effect that follows the pointer"
)]
pub struct Cli {
    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Window title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Exit after presenting this many frames.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_frames: Option<u64>,

    /// Adapter preference: `low` (integrated) or `high` (discrete).
    #[arg(
        long,
        value_name = "low|high",
        env = "GRIDSHADE_GPU_POWER",
        value_parser = parse_gpu_power,
        default_value = "high"
    )]
    pub gpu_power: GpuPowerPreference,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}' in size", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}' in size", height.trim()))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "low" | "low-power" | "integrated" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" | "discrete" => Ok(GpuPowerPreference::High),
        "" => Err("gpu power preference must not be empty".to_string()),
        _ => Err(format!(
            "unknown gpu power preference '{}' (expected low or high)",
            value.trim()
        )),
    }
}
