use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::audio::CaptureParams;

#[derive(Parser, Debug)]
#[command(name = "hear")]
#[command(about = "Capture audio from JACK or the default input device", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of ~/.config/hear/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Capture and print per-channel peak levels until Ctrl+C (default)
    Listen(ListenCliArgs),
    /// Show the host APIs the probe sees and which backend would be used
    Hosts,
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct ListenCliArgs {
    /// Number of input channels
    #[arg(short, long)]
    pub channels: Option<u16>,
    /// Sample rate in Hz (ignored under JACK)
    #[arg(short, long)]
    pub rate: Option<u32>,
    /// Frames per block (ignored under JACK)
    #[arg(short, long)]
    pub frames: Option<u32>,
    /// JACK client name
    #[arg(long)]
    pub client_name: Option<String>,
    /// Print levels once every N blocks
    #[arg(long, default_value = "20")]
    pub every: usize,
}

impl Default for ListenCliArgs {
    fn default() -> Self {
        Self {
            channels: None,
            rate: None,
            frames: None,
            client_name: None,
            every: 20,
        }
    }
}

impl ListenCliArgs {
    /// Overlay the flags that were given on top of `params`.
    pub fn apply(&self, params: &mut CaptureParams) {
        if let Some(channels) = self.channels {
            params.channels = channels;
        }
        if let Some(rate) = self.rate {
            params.rate = rate;
        }
        if let Some(frames) = self.frames {
            params.frames_per_buffer = frames;
        }
        if let Some(name) = &self.client_name {
            params.client_name = name.clone();
        }
    }
}
