//! Real-time head pose overlay on camera or video input.

use anyhow::Result;
use clap::Parser;
use head_pose_overlay::{app::HeadPoseApp, cli::Args, config::Config};
use log::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Head Pose Overlay");

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).unwrap_or_else(|e| {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            })
        }
        None => Config::default(),
    };

    let app_config = args.into_app_config(config);
    app_config.config.check_model_paths()?;

    let mut app = HeadPoseApp::new(app_config)?;
    app.run()?;

    Ok(())
}
