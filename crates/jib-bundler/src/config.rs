//! Bundle configuration assembly.
//!
//! One `BundleConfig` per target, assembled from the project layout and the
//! [`BuildEnv`](crate::BuildEnv) flag snapshot, then rendered into an esbuild
//! argument vector by [`BundleConfig::to_args`]. The assembly is pure: no
//! filesystem writes, no process spawns, so the whole matrix is unit-testable.
//!
//! Policy carried here:
//! - client: browser platform, ESM output under `<build>/public/` at the
//!   configured public path (`<build>/public/assets/` by default), hashed
//!   names and code splitting in production, stable names in dev
//! - server: node platform, CommonJS `server.js` at the build root, packages
//!   externalized, never minified names (the app requires it by path)
//! - minification only in production, with console calls dropped unless
//!   `ALLOW_CONSOLE` is set
//! - source maps inline in development unless `SOURCE_MAP=false`, absent in
//!   production

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::target::{BuildEnv, TargetKind};
use crate::{Error, Result};

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Esm,
    Cjs,
    Iife,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Esm => "esm",
            OutputFormat::Cjs => "cjs",
            OutputFormat::Iife => "iife",
        }
    }
}

/// Platform the bundle will execute on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Browser,
    Node,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Browser => "browser",
            Platform::Node => "node",
        }
    }
}

/// Source map emission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMapMode {
    None,
    Inline,
    External,
}

/// Project-level inputs shared by both target configurations.
#[derive(Debug, Clone)]
pub struct BundleInputs {
    /// Source directory holding the entry files.
    pub src_dir: PathBuf,
    /// Build output root.
    pub build_dir: PathBuf,
    /// URL prefix for browser assets.
    pub public_path: String,
    /// Free variables injected as the `CONFIG` define.
    pub globals: serde_json::Value,
    /// Mirrors the CLI verbose flag into the `__DEVTOOLS__` define.
    pub verbose: bool,
}

impl BundleInputs {
    pub fn new(src_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        BundleInputs {
            src_dir: src_dir.into(),
            build_dir: build_dir.into(),
            public_path: "/assets/".to_string(),
            globals: json!({}),
            verbose: false,
        }
    }

    pub fn public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = public_path.into();
        self
    }

    pub fn globals(mut self, globals: serde_json::Value) -> Self {
        self.globals = globals;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Declarative bundle configuration for one target.
///
/// Constructed by [`BundleConfig::client`] / [`BundleConfig::server`];
/// consumed by the esbuild driver.
#[derive(Debug, Clone)]
pub struct BundleConfig {
    pub target: TargetKind,
    pub entry: PathBuf,
    /// Output directory (client) - ignored when `outfile` is set.
    pub outdir: Option<PathBuf>,
    /// Single-file output (server).
    pub outfile: Option<PathBuf>,
    pub public_path: String,
    pub format: OutputFormat,
    pub platform: Platform,
    pub minify: bool,
    pub drop_console: bool,
    pub sourcemap: SourceMapMode,
    pub splitting: bool,
    /// esbuild `--entry-names` template, production only.
    pub entry_names: Option<String>,
    pub chunk_names: Option<String>,
    pub asset_names: Option<String>,
    /// `--define` map; values are already JS expressions.
    pub defines: BTreeMap<String, String>,
    pub external: Vec<String>,
    /// `--packages=external` (server target).
    pub packages_external: bool,
    /// Where the driver tells esbuild to write the metafile.
    pub metafile: PathBuf,
    /// File-type loader overrides (`.png` -> `file`).
    pub loaders: BTreeMap<&'static str, &'static str>,
}

impl BundleConfig {
    /// Assemble the browser bundle configuration.
    pub fn client(inputs: &BundleInputs, env: &BuildEnv) -> Result<Self> {
        let entry = resolve_entry(&inputs.src_dir, TargetKind::Client)?;
        let prod = env.is_production();

        let mut defines = shared_defines(inputs, env);
        defines.insert(
            "process.env.NODE_ENV".to_string(),
            serde_json::Value::String(env.node_env.clone()).to_string(),
        );
        defines.insert("process.env.BROWSER".to_string(), "true".to_string());
        defines.insert("__DEVTOOLS__".to_string(), inputs.verbose.to_string());

        Ok(BundleConfig {
            target: TargetKind::Client,
            entry,
            outdir: Some(client_outdir(inputs)),
            outfile: None,
            public_path: inputs.public_path.clone(),
            format: OutputFormat::Esm,
            platform: Platform::Browser,
            minify: prod,
            drop_console: prod && !env.allow_console,
            sourcemap: dev_sourcemap(env),
            splitting: prod,
            entry_names: prod.then(|| "[name].[hash]".to_string()),
            chunk_names: Some(if prod {
                "[name].chunk.[hash]".to_string()
            } else {
                "[name].chunk".to_string()
            }),
            asset_names: Some(if prod { "[hash]" } else { "[name]" }.to_string()),
            defines,
            external: Vec::new(),
            packages_external: false,
            metafile: inputs.build_dir.join("client-meta.json"),
            loaders: static_loaders(),
        })
    }

    /// Assemble the server-rendering bundle configuration.
    pub fn server(inputs: &BundleInputs, env: &BuildEnv) -> Result<Self> {
        let entry = resolve_entry(&inputs.src_dir, TargetKind::Server)?;
        let prod = env.is_production();

        let mut defines = shared_defines(inputs, env);
        defines.insert("process.env.BROWSER".to_string(), "false".to_string());
        defines.insert("__DEVTOOLS__".to_string(), "false".to_string());

        Ok(BundleConfig {
            target: TargetKind::Server,
            entry,
            outdir: None,
            outfile: Some(inputs.build_dir.join("server.js")),
            public_path: inputs.public_path.clone(),
            format: OutputFormat::Cjs,
            platform: Platform::Node,
            minify: prod,
            drop_console: false,
            sourcemap: dev_sourcemap(env),
            splitting: false,
            entry_names: None,
            chunk_names: None,
            asset_names: None,
            defines,
            // The app reads the manifest at runtime, relative to the bundle.
            external: vec!["./assets.json".to_string()],
            packages_external: true,
            metafile: inputs.build_dir.join("server-meta.json"),
            loaders: static_loaders(),
        })
    }

    /// Render the esbuild argument vector.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.entry.display().to_string(),
            "--bundle".to_string(),
            "--color=false".to_string(),
            "--log-level=warning".to_string(),
            format!("--format={}", self.format.as_str()),
            format!("--platform={}", self.platform.as_str()),
            format!("--metafile={}", self.metafile.display()),
        ];

        if let Some(outfile) = &self.outfile {
            args.push(format!("--outfile={}", outfile.display()));
        } else if let Some(outdir) = &self.outdir {
            args.push(format!("--outdir={}", outdir.display()));
            args.push(format!("--public-path={}", trim_trailing_slash(&self.public_path)));
        }

        if self.splitting {
            args.push("--splitting".to_string());
        }
        if let Some(names) = &self.entry_names {
            args.push(format!("--entry-names={}", names));
        }
        if let Some(names) = &self.chunk_names {
            args.push(format!("--chunk-names={}", names));
        }
        if let Some(names) = &self.asset_names {
            args.push(format!("--asset-names={}", names));
        }

        if self.minify {
            args.push("--minify".to_string());
        }
        if self.drop_console {
            args.push("--drop:console".to_string());
        }
        match self.sourcemap {
            SourceMapMode::None => {}
            SourceMapMode::Inline => args.push("--sourcemap=inline".to_string()),
            SourceMapMode::External => args.push("--sourcemap=external".to_string()),
        }

        for (key, value) in &self.defines {
            args.push(format!("--define:{}={}", key, value));
        }
        for external in &self.external {
            args.push(format!("--external:{}", external));
        }
        if self.packages_external {
            args.push("--packages=external".to_string());
        }
        for (ext, loader) in &self.loaders {
            args.push(format!("--loader:{}={}", ext, loader));
        }

        args
    }
}

/// Client artifacts land under `<build>/public/` mirroring the public path,
/// so the URL a manifest emits is also where the file sits on disk relative
/// to the served root.
fn client_outdir(inputs: &BundleInputs) -> PathBuf {
    let mut dir = inputs.build_dir.join("public");
    for part in inputs.public_path.split('/').filter(|p| !p.is_empty()) {
        dir.push(part);
    }
    dir
}

fn shared_defines(inputs: &BundleInputs, env: &BuildEnv) -> BTreeMap<String, String> {
    let mut defines = BTreeMap::new();
    defines.insert("CONFIG".to_string(), inputs.globals.to_string());
    defines.insert(
        "process.env.DEV_SERVER".to_string(),
        env.dev_server.to_string(),
    );
    defines
}

fn dev_sourcemap(env: &BuildEnv) -> SourceMapMode {
    if !env.is_production() && env.source_map {
        SourceMapMode::Inline
    } else {
        SourceMapMode::None
    }
}

fn static_loaders() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        (".gif", "file"),
        (".svg", "file"),
        (".png", "file"),
        (".jpg", "file"),
        (".jpeg", "file"),
        (".pdf", "file"),
        (".graphql", "text"),
        (".gql", "text"),
    ])
}

/// Find the entry file for a target, trying extensions in fixed order.
fn resolve_entry(src_dir: &Path, target: TargetKind) -> Result<PathBuf> {
    const EXTENSIONS: [&str; 4] = ["tsx", "ts", "jsx", "js"];

    for ext in EXTENSIONS {
        let candidate = src_dir.join(format!("{}.{}", target.as_str(), ext));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(Error::MissingEntry {
        target,
        dir: src_dir.display().to_string(),
        tried: EXTENSIONS
            .iter()
            .map(|ext| format!("{}.{}", target.as_str(), ext))
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
