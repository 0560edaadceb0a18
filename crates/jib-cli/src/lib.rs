//! Jib CLI - scaffold tooling for server-side-rendered web applications.
//!
//! This crate provides the `jib` binary: a thin dispatcher over four tasks
//! (`build`, `start`, `test`, `serve`) plus the development-server
//! orchestration that is the heart of `start`. The declarative build layer
//! lives in `jib-bundler`; this crate adds the CLI surface, project
//! configuration, terminal UI, and the dev-server coordination logic.
//!
//! # Architecture
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - one module per subcommand, plus the task-timing wrapper
//! - [`config`] - project paths and `jib.config.json` loading
//! - [`dev`] - the dev-server orchestrator, readiness gate, app handle,
//!   HTTP server, and file watcher
//! - [`error`] - error types with actionable messages
//! - [`logger`] - tracing setup
//! - [`ui`] - terminal output helpers

// Public modules
pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use error::{CliError, ConfigError, DevError, Result};
