//! Logging setup for the jib CLI.
//!
//! Structured logging via the `tracing` ecosystem with three verbosity
//! levels and color control:
//!
//! - `--verbose` - debug level for the jib crates
//! - `--quiet` - errors only
//! - default - info level, overridable through `RUST_LOG`

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Call once at startup, before any logging. Level resolution order:
/// `--verbose`, then `--quiet`, then `RUST_LOG`, then info.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("jib=debug,jib_cli=debug,jib_bundler=debug")
    } else if quiet {
        EnvFilter::new("jib=error,jib_cli=error,jib_bundler=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("jib=info,jib_cli=info,jib_bundler=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // try_init rather than init: the integration tests construct the CLI
    // more than once per process.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse() {
        let _ = EnvFilter::new("jib=debug,jib_cli=debug,jib_bundler=debug");
        let _ = EnvFilter::new("jib=error,jib_cli=error,jib_bundler=error");
    }

    #[test]
    fn init_is_idempotent() {
        init_logger(false, false, true);
        init_logger(true, false, true);
    }
}
