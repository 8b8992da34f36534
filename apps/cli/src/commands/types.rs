//! Command type definitions shared between main.rs and the command modules.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Arguments for `montage generate`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Text prompt describing the video
    #[arg(short, long, default_value = "")]
    pub prompt: String,

    /// Source image for image-to-video generation
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Clip duration in seconds
    #[arg(short, long, default_value_t = 5.0)]
    pub duration: f64,

    /// Frames per second
    #[arg(long, default_value_t = 24)]
    pub fps: u32,

    /// Frame width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 1024)]
    pub height: u32,

    /// Motion intensity between 0 and 1
    #[arg(long, default_value_t = 0.5)]
    pub motion: f64,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output container format
    #[arg(long, default_value = "mp4")]
    pub format: String,

    /// Engine to use (repeat to give fallbacks in order)
    #[arg(short, long = "engine")]
    pub engines: Vec<String>,

    /// Routing strategy (priority, free_first, fastest, cheapest, load_balance)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EnginesCommand {
    /// List all configured engines
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show detailed information about an engine
    Show {
        /// Engine name (e.g. cogvideox_flash)
        engine: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test engine connectivity
    Test {
        /// Engine name (tests every engine when omitted)
        engine: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
