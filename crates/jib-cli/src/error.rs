//! Error types for the jib CLI.
//!
//! A small hierarchy built with `thiserror`:
//!
//! - [`CliError`] - top level, returned by every command
//! - [`ConfigError`] - project configuration loading and validation
//! - [`DevError`] - dev-server orchestration failures
//!
//! Conversion to `miette` reports happens once, at the binary edge
//! (see the `miette` submodule).

mod miette;

use std::path::PathBuf;

use thiserror::Error;

pub use miette::to_report;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration loading or validation failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dev-server orchestration failed
    #[error("Dev server error: {0}")]
    Dev(#[from] DevError),

    /// The bundler layer reported an error
    #[error(transparent)]
    Bundle(#[from] jib_bundler::Error),

    /// A required external tool is missing or failed to spawn
    #[error("Failed to run '{name}': {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A required external tool is not on PATH
    #[error("'{name}' not found on PATH")]
    ToolNotFound { name: &'static str },

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// jib.config.json exists but could not be read or merged
    #[error("Failed to load jib.config.json: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A configuration value is out of range or malformed
    #[error("Invalid value for '{field}': {value}")]
    InvalidValue {
        field: &'static str,
        value: String,
        hint: &'static str,
    },

    /// The resolved project root does not exist
    #[error("Project root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    /// I/O error while reading configuration
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Dev-server orchestration errors.
#[derive(Debug, Error)]
pub enum DevError {
    /// The HTTP server could not bind its address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The app child process could not be started or never became reachable
    #[error("Failed to start the app process: {0}")]
    AppStart(String),

    /// Forwarding a request into the app module failed
    #[error("App request failed: {0}")]
    Proxy(#[from] reqwest::Error),

    /// The hot-update control endpoint misbehaved
    #[error("Hot-update control error: {0}")]
    HotControl(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error inside the dev server
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Result type alias for dev-server internals.
pub type DevResult<T> = std::result::Result<T, DevError>;

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}
