// file: src/lifecycle/command.rs
// version: 1.0.0
// guid: 4f0b8a63-2d1e-4c57-9a8e-61d3c2b7e0f4

//! Validated commands and their results

use crate::image::ImageName;
use std::fmt;
use std::path::{Path, PathBuf};

/// One znx invocation with its arguments already checked against the grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init {
        device: PathBuf,
    },
    Deploy {
        device: PathBuf,
        image: ImageName,
        source: String,
    },
    Update {
        device: PathBuf,
        image: ImageName,
    },
    Revert {
        device: PathBuf,
        image: ImageName,
    },
    Clean {
        device: PathBuf,
        image: ImageName,
    },
    Remove {
        device: PathBuf,
        image: ImageName,
    },
    List {
        device: PathBuf,
    },
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init { .. } => "init",
            Command::Deploy { .. } => "deploy",
            Command::Update { .. } => "update",
            Command::Revert { .. } => "revert",
            Command::Clean { .. } => "clean",
            Command::Remove { .. } => "remove",
            Command::List { .. } => "list",
        }
    }

    pub fn device(&self) -> &Path {
        match self {
            Command::Init { device }
            | Command::Deploy { device, .. }
            | Command::Update { device, .. }
            | Command::Revert { device, .. }
            | Command::Clean { device, .. }
            | Command::Remove { device, .. }
            | Command::List { device } => device,
        }
    }

    /// Image the command targets, if it takes one
    pub fn image(&self) -> Option<&ImageName> {
        match self {
            Command::Init { .. } | Command::List { .. } => None,
            Command::Deploy { image, .. }
            | Command::Update { image, .. }
            | Command::Revert { image, .. }
            | Command::Clean { image, .. }
            | Command::Remove { image, .. } => Some(image),
        }
    }
}

/// What a successful command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Initialized(PathBuf),
    Deployed(ImageName),
    Updated {
        image: ImageName,
        backup_replaced: bool,
    },
    Reverted(ImageName),
    Cleaned {
        image: ImageName,
        removed: bool,
    },
    Removed(ImageName),
    Listed(Vec<ImageName>),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Initialized(device) => {
                write!(f, "{} was successfully initialized", device.display())
            }
            Outcome::Deployed(image) => write!(f, "{} was successfully deployed", image),
            Outcome::Updated { image, .. } => write!(f, "{} was successfully updated", image),
            Outcome::Reverted(image) => {
                write!(f, "{} was successfully reverted to its backup", image)
            }
            Outcome::Cleaned { image, removed: true } => {
                write!(f, "Removed the backup generation of {}", image)
            }
            Outcome::Cleaned { image, removed: false } => {
                write!(f, "{} has no backup generation", image)
            }
            Outcome::Removed(image) => write!(f, "{} was successfully removed", image),
            Outcome::Listed(images) => {
                for image in images {
                    writeln!(f, "{}", image)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageName {
        "nitrux/nx-desktop".parse().unwrap()
    }

    #[test]
    fn test_accessors() {
        let deploy = Command::Deploy {
            device: PathBuf::from("/dev/sdb"),
            image: image(),
            source: "./nx.iso".to_string(),
        };
        assert_eq!(deploy.name(), "deploy");
        assert_eq!(deploy.device(), Path::new("/dev/sdb"));
        assert_eq!(deploy.image(), Some(&image()));

        let list = Command::List {
            device: PathBuf::from("/dev/sdc"),
        };
        assert_eq!(list.name(), "list");
        assert_eq!(list.image(), None);
    }

    #[test]
    fn test_listing_prints_one_name_per_line() {
        let outcome = Outcome::Listed(vec![
            "a/one".parse().unwrap(),
            "b/two".parse().unwrap(),
        ]);
        assert_eq!(outcome.to_string(), "a/one\nb/two\n");
        assert_eq!(Outcome::Listed(Vec::new()).to_string(), "");
    }

    #[test]
    fn test_clean_message_reflects_backup() {
        let removed = Outcome::Cleaned {
            image: image(),
            removed: true,
        };
        let kept = Outcome::Cleaned {
            image: image(),
            removed: false,
        };
        assert!(removed.to_string().starts_with("Removed"));
        assert!(kept.to_string().contains("no backup"));
    }
}
