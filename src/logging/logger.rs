// file: src/logging/logger.rs
// version: 1.0.0
// guid: 23225860-62d6-437f-b823-c0cc989605d8

//! Logger initialization and configuration

use crate::Result;
use tracing::Instrument;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
///
/// Logs go to stderr so that `list` output on stdout stays machine readable.
/// `RUST_LOG` takes precedence over the verbosity flags when it is set.
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose, quiet));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .compact(),
        )
        .try_init()
        .map_err(|e| crate::error::ZnxError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

fn default_filter(verbose: bool, quiet: bool) -> EnvFilter {
    EnvFilter::new(level_for(verbose, quiet))
}

fn level_for(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Run an async operation inside an `operation` span
pub async fn with_async_operation_span<F, Fut, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = R>,
{
    let span = tracing::info_span!("operation", name = operation);
    async move { f().await }.instrument(span).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(level_for(true, true), "error");
        assert_eq!(level_for(true, false), "debug");
        assert_eq!(level_for(false, false), "info");
    }

    #[test]
    fn test_init_logger_twice() {
        // Only one global subscriber can be installed per process; the second
        // call must report an error instead of panicking.
        let _ = init_logger(false, false);
        assert!(init_logger(false, false).is_err());
    }

    #[tokio::test]
    async fn test_with_async_operation_span() {
        let result = with_async_operation_span("deploy", || async { 42 }).await;
        assert_eq!(result, 42);
    }
}
