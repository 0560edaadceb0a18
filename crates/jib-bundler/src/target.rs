//! Build target vocabulary and the environment-flag snapshot.
//!
//! Two compilation pipelines exist per project:
//! - `TargetKind::Client`: the browser bundle, served under the public path
//! - `TargetKind::Server`: the server-rendering bundle, loaded as the app module
//!
//! `BuildEnv` captures the environment flags that shape both bundle
//! configurations, read once at startup rather than scattered through the
//! assembly code.

use serde::{Deserialize, Serialize};

/// Which of the two compilation pipelines an event or configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Browser bundle
    Client,
    /// Server-rendering bundle
    Server,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Client => "client",
            TargetKind::Server => "server",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-target compilation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileState {
    /// No compile has run yet, or the last one finished and nothing is queued.
    Idle,
    /// A compile is in flight.
    Compiling,
    /// The last compile finished.
    Done { success: bool },
}

impl CompileState {
    pub fn is_compiling(&self) -> bool {
        matches!(self, CompileState::Compiling)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, CompileState::Done { success: true })
    }
}

/// Snapshot of the environment flags consumed by bundle assembly.
///
/// Read once via [`BuildEnv::from_env`]; the rest of the crate takes the
/// snapshot by reference so a mid-build environment change cannot produce a
/// half-and-half configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    /// `NODE_ENV`, defaulting to `development`.
    pub node_env: String,
    /// `BABEL_ENV`, defaulting to the value of `NODE_ENV`.
    pub babel_env: String,
    /// `SOURCE_MAP` - on unless explicitly `false`.
    pub source_map: bool,
    /// `DEV_SERVER` - true only when the dev server set it.
    pub dev_server: bool,
    /// `ALLOW_CONSOLE` - keep console calls in minified output.
    pub allow_console: bool,
    /// `GENERATE_SW` - run the service-worker generator after a build.
    pub generate_sw: bool,
    /// `SW_IMPORTS` - comma-separated extra importScripts for the generated worker.
    pub sw_imports: Option<String>,
    /// `BUNDLE_PARALLEL` (or the legacy `WEBPACK_PARALLEL`) - compile the
    /// two targets concurrently.
    pub parallel: bool,
}

impl Default for BuildEnv {
    fn default() -> Self {
        BuildEnv {
            node_env: "development".to_string(),
            babel_env: "development".to_string(),
            source_map: true,
            dev_server: false,
            allow_console: false,
            generate_sw: false,
            sw_imports: None,
            parallel: false,
        }
    }
}

impl BuildEnv {
    /// Capture the current process environment.
    pub fn from_env() -> Self {
        let node_env = std::env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string());
        let babel_env = std::env::var("BABEL_ENV").unwrap_or_else(|_| node_env.clone());

        BuildEnv {
            source_map: std::env::var("SOURCE_MAP").map(|v| v != "false").unwrap_or(true),
            dev_server: std::env::var("DEV_SERVER").map(|v| v == "true").unwrap_or(false),
            allow_console: truthy(std::env::var("ALLOW_CONSOLE").ok()),
            generate_sw: truthy(std::env::var("GENERATE_SW").ok()),
            sw_imports: std::env::var("SW_IMPORTS").ok().filter(|v| !v.is_empty()),
            parallel: parallel_flag(
                std::env::var("BUNDLE_PARALLEL").ok(),
                std::env::var("WEBPACK_PARALLEL").ok(),
            ),
            node_env,
            babel_env,
        }
    }

    pub fn is_production(&self) -> bool {
        self.node_env == "production"
    }

    /// Bundler mode string, mirrored into logs.
    pub fn mode(&self) -> &'static str {
        if self.is_production() { "production" } else { "development" }
    }
}

/// `BUNDLE_PARALLEL` wins when set; `WEBPACK_PARALLEL` is honored for
/// projects migrating from the webpack-era toolchain.
fn parallel_flag(bundle: Option<String>, webpack: Option<String>) -> bool {
    truthy(bundle.or(webpack))
}

fn truthy(value: Option<String>) -> bool {
    match value.as_deref() {
        None | Some("") | Some("false") | Some("0") => false,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_kind_round_trips_through_serde() {
        let json = serde_json::to_string(&TargetKind::Client).unwrap();
        assert_eq!(json, "\"client\"");
        let back: TargetKind = serde_json::from_str("\"server\"").unwrap();
        assert_eq!(back, TargetKind::Server);
    }

    #[test]
    fn truthy_rejects_explicit_negatives() {
        assert!(!truthy(None));
        assert!(!truthy(Some(String::new())));
        assert!(!truthy(Some("false".to_string())));
        assert!(!truthy(Some("0".to_string())));
        assert!(truthy(Some("1".to_string())));
        assert!(truthy(Some("yes".to_string())));
    }

    #[test]
    fn legacy_parallel_variable_is_honored() {
        assert!(!parallel_flag(None, None));
        assert!(parallel_flag(Some("true".to_string()), None));
        assert!(parallel_flag(None, Some("true".to_string())));
        // The current name takes precedence over the legacy one.
        assert!(!parallel_flag(
            Some("false".to_string()),
            Some("true".to_string())
        ));
    }

    #[test]
    fn default_env_is_development() {
        let env = BuildEnv::default();
        assert!(!env.is_production());
        assert_eq!(env.mode(), "development");
        assert!(env.source_map);
        assert!(!env.dev_server);
    }
}
