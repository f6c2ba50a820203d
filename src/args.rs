use clap::Parser;
use std::path::PathBuf;

use hdmi_mirror::config;

#[derive(Parser, Debug)]
#[command(name = "hdmi-mirror")]
#[command(author = "Selkies Team")]
#[command(version = "0.2.0")]
#[command(about = "Dry-run driver for the HDMI mirroring core", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/hdmi-mirror.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long, action)]
    pub verbose: bool,

    /// Number of vsync frames to simulate
    #[arg(short, long, default_value = "120")]
    pub frames: u32,

    /// Display server control block to read orientation from
    #[arg(long)]
    pub control_block: Option<PathBuf>,

    /// Print every recomputed blit descriptor as JSON
    #[arg(long, action)]
    pub json: bool,
}

impl Args {
    pub fn load_config(&self) -> hdmi_mirror::Result<config::Config> {
        config::Config::load(&self.config)
    }
}
