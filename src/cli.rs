use clap::Parser;
use std::path::PathBuf;

/// Live controller overlay driven by annotated skins
#[derive(Parser, Debug)]
#[command(about = "Live controller input overlay driven by annotated SVG skins", version)]
pub struct Args {
    /// Skin to open (.svg or image-grid .xml); overrides the configured one
    #[arg(long)]
    pub skin: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frame rate cap
    #[arg(long)]
    pub max_fps: Option<u32>,

    /// Render one idle frame to this PNG and exit
    #[arg(long, value_name = "PNG")]
    pub dump_frame: Option<PathBuf>,

    /// Run without a window, rendering offscreen until interrupted
    #[arg(long)]
    pub headless: bool,
}
