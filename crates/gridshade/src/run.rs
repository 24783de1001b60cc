use anyhow::Result;
use renderer::{Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn run(cli: Cli) -> Result<()> {
    let config = build_config(cli);
    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        max_frames = ?config.max_frames,
        gpu_power = %config.power_preference,
        "starting grid effect"
    );
    Renderer::new(config).run()
}

pub fn build_config(cli: Cli) -> RendererConfig {
    let defaults = RendererConfig::default();
    RendererConfig {
        surface_size: cli.size.unwrap_or(defaults.surface_size),
        title: cli.title.unwrap_or(defaults.title),
        max_frames: cli.max_frames,
        power_preference: cli.gpu_power,
    }
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
