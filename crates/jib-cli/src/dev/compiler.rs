//! The per-target compile abstraction.
//!
//! The orchestrator drives compilation through this trait so its state
//! machine can be exercised without a real bundler. The production
//! implementation renders the dev-mode bundle configurations once at startup
//! and replays them through the esbuild driver on every cycle.

use async_trait::async_trait;
use jib_bundler::{BuildEnv, BundleConfig, BundleInputs, CompileStats, Esbuild, TargetKind};

/// One compile run per call, for one target.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, target: TargetKind) -> jib_bundler::Result<CompileStats>;
}

/// esbuild-backed compiler holding both dev-mode bundle configurations.
pub struct EsbuildCompiler {
    esbuild: Esbuild,
    client: BundleConfig,
    server: BundleConfig,
}

impl EsbuildCompiler {
    /// Resolve both entries and locate the esbuild binary.
    ///
    /// Entry resolution happens here, once; a project that loses its entry
    /// file mid-session surfaces that as a compile error on the next cycle
    /// rather than a config error.
    pub fn new(inputs: &BundleInputs, env: &BuildEnv) -> jib_bundler::Result<Self> {
        Ok(EsbuildCompiler {
            esbuild: Esbuild::locate()?,
            client: BundleConfig::client(inputs, env)?,
            server: BundleConfig::server(inputs, env)?,
        })
    }

    pub fn config(&self, target: TargetKind) -> &BundleConfig {
        match target {
            TargetKind::Client => &self.client,
            TargetKind::Server => &self.server,
        }
    }
}

#[async_trait]
impl Compiler for EsbuildCompiler {
    async fn compile(&self, target: TargetKind) -> jib_bundler::Result<CompileStats> {
        self.esbuild.compile(self.config(target)).await
    }
}
