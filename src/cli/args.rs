// file: src/cli/args.rs
// version: 2.0.0
// guid: f3a1c9d7-58e2-4b06-a4d3-7e90b21c5f84

//! Command line argument definitions

use crate::config::CONFIG_ENV;
use crate::image::ImageName;
use crate::lifecycle::Command;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "znx")]
#[command(about = "Manage bootable image slots with A/B updates and rollback")]
#[command(version, disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Partition and format a device for znx (destroys all data on it)
    Init {
        device: PathBuf,
    },

    /// Deploy an image from a local file or URL
    Deploy {
        device: PathBuf,

        /// Image name as <vendor>/<name>
        image: ImageName,

        /// Local path, http(s) URL, or URL of a .zsync control file
        source: String,
    },

    /// Delta-update an image, keeping the current one as backup
    Update {
        device: PathBuf,
        image: ImageName,
    },

    /// Switch an image back to its backup
    Revert {
        device: PathBuf,
        image: ImageName,
    },

    /// Delete the backup of an image
    Clean {
        device: PathBuf,
        image: ImageName,
    },

    /// Delete an image and its backup
    Remove {
        device: PathBuf,
        image: ImageName,
    },

    /// List deployed images
    List {
        device: PathBuf,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Init { device } => Command::Init { device },
            Commands::Deploy {
                device,
                image,
                source,
            } => Command::Deploy {
                device,
                image,
                source,
            },
            Commands::Update { device, image } => Command::Update { device, image },
            Commands::Revert { device, image } => Command::Revert { device, image },
            Commands::Clean { device, image } => Command::Clean { device, image },
            Commands::Remove { device, image } => Command::Remove { device, image },
            Commands::List { device } => Command::List { device },
        }
    }
}
