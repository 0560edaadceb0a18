//! Command-line interface definition for jib.
//!
//! Defines the CLI structure with clap's derive macros. Four subcommands map
//! onto the four tasks: `build` (one-shot production build), `start` (dev
//! server), `test` (jest wrapper), `serve` (production server child).
//! Unknown subcommands are rejected by clap with a usage error and a
//! non-zero exit, without side effects.

mod commands;

use std::path::PathBuf;

use clap::Parser;

pub use commands::{BuildArgs, Command, ServeArgs, StartArgs, TestArgs};

/// Jib - scaffold tooling for SSR web applications
#[derive(Parser, Debug)]
#[command(
    name = "jib",
    version,
    about = "Scaffold tooling for server-side-rendered web applications",
    long_about = "Jib wires together a bundler, a test runner, and a development server\n\
                  for SSR web applications: one-shot production builds, a dev server\n\
                  with hot module replacement for the server bundle, and thin wrappers\n\
                  around jest and the production server process."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project root directory
    ///
    /// Overrides root auto-detection. When absent, jib uses JIB_ROOT, then
    /// searches ancestors for jib.config.json or package.json, then falls
    /// back to the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Global flags threaded into the command implementations.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub verbose: bool,
    pub root: Option<PathBuf>,
}
