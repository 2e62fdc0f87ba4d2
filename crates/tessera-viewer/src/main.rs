mod app;
mod camera;

use std::path::PathBuf;

use clap::Parser;
use tessera_engine::device::GpuInit;
use tessera_engine::logging::{init_logging, LoggingConfig};
use tessera_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use crate::app::ViewerApp;

/// Minimal glTF viewer.
#[derive(Debug, Parser)]
#[command(name = "tessera-viewer", version, about)]
struct ViewerArgs {
    /// Path to a .gltf or .glb file.
    #[arg(default_value = "models/frog/frog.gltf")]
    scene: PathBuf,

    /// WGSL file replacing the built-in model shader.
    #[arg(long)]
    shader: Option<PathBuf>,

    /// Window title.
    #[arg(long, default_value = "tessera")]
    title: String,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Log filter, env_logger syntax. Falls back to RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = ViewerArgs::parse();

    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..Default::default()
    });

    let config = RuntimeConfig {
        title: args.title.clone(),
        initial_size: LogicalSize::new(f64::from(args.width), f64::from(args.height)),
    };
    let gpu_init = GpuInit {
        required_features: wgpu::Features::INDIRECT_FIRST_INSTANCE,
        present_mode: wgpu::PresentMode::Fifo,
        ..Default::default()
    };

    let result = Runtime::run(config, gpu_init, ViewerApp::new(args.scene, args.shader));
    if let Err(err) = &result {
        log::error!("{err:#}");
    }
    result
}
