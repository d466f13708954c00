// file: src/main.rs
// version: 2.0.0
// guid: 5c81e0f4-2a3d-4e97-8b6c-d14f9a07e253

//! znx - main entry point

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing::warn;
use znx::{
    cli::{self, Cli},
    logging::logger,
    ZnxError,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if let Err(e) = logger::init_logger(cli.verbose, cli.quiet) {
        return fail(&e);
    }

    // Dropping the command future releases any mount it holds.
    let result = tokio::select! {
        result = cli::execute(cli) => result,
        signal = shutdown_signal() => {
            warn!("Received {}, cleaning up", signal);
            Err(ZnxError::Interrupted(signal))
        }
    };

    match result.and_then(|outcome| cli::report(&outcome)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(error: &ZnxError) -> ExitCode {
    eprintln!("{} {}", "znx: error:".red().bold(), error);
    ExitCode::from(error.exit_code())
}

/// Resolves with the name of the first termination signal received
#[cfg(unix)]
async fn shutdown_signal() -> String {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut interrupt), Ok(mut terminate), Ok(mut hangup)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) else {
        warn!("Could not install signal handlers");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = interrupt.recv() => "SIGINT".to_string(),
        _ = terminate.recv() => "SIGTERM".to_string(),
        _ = hangup.recv() => "SIGHUP".to_string(),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> String {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "Ctrl+C".to_string(),
        Err(_) => std::future::pending().await,
    }
}
