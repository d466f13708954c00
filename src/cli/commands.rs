// file: src/cli/commands.rs
// version: 2.0.0
// guid: 7e4d2b18-c6a9-4f50-93e1-5b08fa2d7c63

//! Command execution for the CLI

use super::args::Cli;
use crate::config::ConfigLoader;
use crate::lifecycle::{Command, Controller, Outcome};
use crate::logging::with_async_operation_span;
use crate::Result;
use std::io::Write;
use tracing::info;

/// Load configuration and run the parsed command
pub async fn execute(cli: Cli) -> Result<Outcome> {
    let config = ConfigLoader::new().load(cli.config.as_deref())?;
    let command = Command::from(cli.command);
    let controller = Controller::new(config)?;

    with_async_operation_span(command.name(), || controller.run(&command)).await
}

/// Report a successful outcome.
///
/// Listings go to stdout, one name per line; everything else is a log line.
pub fn report(outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Listed(_) => {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{}", outcome)?;
            stdout.flush()?;
        }
        _ => info!("{}", outcome),
    }
    Ok(())
}
