//! Command line arguments and their mapping onto the configuration.

use crate::{
    app::{AppConfig, VideoSource},
    config::Config,
    inference::ExecutionTarget,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about = "Real-time head pose overlay", long_about = None)]
pub struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    pub cam: i32,

    /// Video file to process instead of a camera
    #[arg(short, long)]
    pub video: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Output video path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not record the annotated video
    #[arg(long)]
    pub no_record: bool,

    /// Run without a display window
    #[arg(long)]
    pub headless: bool,

    /// Run inference with the CUDA execution provider
    #[arg(long)]
    pub cuda: bool,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    /// Apply command line overrides on top of a loaded configuration
    #[must_use]
    pub fn into_app_config(self, mut config: Config) -> AppConfig {
        if let Some(output) = self.output {
            config.recording.output = output;
        }
        if self.no_record {
            config.recording.enabled = false;
        }
        if self.headless {
            config.display.enabled = false;
        }
        if self.cuda {
            config.inference.execution = ExecutionTarget::Cuda;
        }

        AppConfig {
            video_source: match self.video {
                Some(path) => VideoSource::File(path),
                None => VideoSource::Camera(self.cam),
            },
            config,
            max_frames: self.max_frames,
        }
    }
}
