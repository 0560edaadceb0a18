//! # jib-bundler
//!
//! Build descriptors and the bundler driver for the jib scaffold.
//!
//! This crate owns the declarative side of a jib build: per-target bundle
//! configurations assembled from environment flags, the esbuild child-process
//! driver that executes them, metafile parsing, manifest generation, the
//! service-worker generator invocation, and the test-runner configuration.
//! It knows nothing about the CLI or the dev server; those live in `jib-cli`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use jib_bundler::{BuildEnv, BundleConfig, BundleInputs, Esbuild};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let env = BuildEnv::from_env();
//! let inputs = BundleInputs::new(Path::new("src"), Path::new("build"));
//! let config = BundleConfig::client(&inputs, &env)?;
//!
//! let esbuild = Esbuild::locate()?;
//! let stats = esbuild.compile(&config).await?;
//! for file in &stats.output_files {
//!     println!("{} ({} bytes)", file.path.display(), file.bytes);
//! }
//! # Ok(()) }
//! ```

pub mod config;
pub mod esbuild;
pub mod manifest;
pub mod metafile;
pub mod sw;
pub mod target;
pub mod test_config;

pub use config::{BundleConfig, BundleInputs, OutputFormat, Platform, SourceMapMode};
pub use esbuild::{CompileStats, Esbuild, OutputFile};
pub use manifest::{assets_manifest, loadable_stats, write_manifests};
pub use metafile::Metafile;
pub use sw::ServiceWorkerConfig;
pub use target::{BuildEnv, CompileState, TargetKind};
pub use test_config::TestRunnerConfig;

/// Error types for jib-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not installed or not on PATH.
    #[error("'{name}' not found on PATH")]
    ToolNotFound { name: &'static str },

    /// The bundler exited non-zero for one target.
    #[error("{target} bundle failed:\n{stderr}")]
    Compile { target: TargetKind, stderr: String },

    /// An external tool ran but exited non-zero.
    #[error("'{name}' failed with {status}:\n{stderr}")]
    Tool {
        name: &'static str,
        status: String,
        stderr: String,
    },

    /// No entry file found for a target.
    #[error("no {target} entry found under {dir} (tried {tried})")]
    MissingEntry {
        target: TargetKind,
        dir: String,
        tried: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The metafile emitted by the bundler could not be parsed.
    #[error("failed to parse metafile {path}: {source}")]
    Metafile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for jib-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach a context message to an I/O error.
    pub fn io_context(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoError {
            message: message.into(),
            source,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            Error::Compile { .. } => "COMPILE_FAILED",
            Error::Tool { .. } => "TOOL_FAILED",
            Error::MissingEntry { .. } => "MISSING_ENTRY",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Metafile { .. } => "METAFILE_PARSE",
            Error::Io(_) | Error::IoError { .. } => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::ToolNotFound { name } => Some(Box::new(format!(
                "Install it first, e.g. `npm install --global {}`, or put it on PATH.",
                name
            ))),
            Error::MissingEntry { dir, tried, .. } => Some(Box::new(format!(
                "Create one of [{}] under {}.",
                tried, dir
            ))),
            Error::Compile { .. } => Some(Box::new(
                "The bundler output above usually names the offending file and line.".to_string(),
            )),
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check jib.config.json for mistakes.\nError: {}",
                msg
            ))),
            _ => None,
        }
    }
}
