//! Project configuration for jib.
//!
//! Two pieces: [`ProjectPaths`], the fixed project layout resolved from the
//! root, and [`AppConfig`], the optional `jib.config.json` layered under the
//! `JIB_` environment prefix via figment.
//! Priority: environment > config file > defaults.

mod loading;
mod paths;

use serde::{Deserialize, Serialize};

pub use paths::ProjectPaths;

/// Project configuration, loaded from `jib.config.json` when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    /// Package name; used for the docker tag and the service-worker cache id.
    #[serde(default = "default_name")]
    pub name: String,

    /// Package version; versions the service-worker precache.
    #[serde(default = "default_version")]
    pub version: String,

    /// Dev-server and production-server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL prefix for browser bundle artifacts.
    #[serde(default = "default_public_path", alias = "public_path")]
    pub public_path: String,

    /// Log file truncated by `clean`, relative to the project root.
    #[serde(default = "default_log_file", alias = "log_file")]
    pub log_file: String,

    /// Free variables injected into both bundles as the CONFIG define.
    #[serde(default = "default_globals")]
    pub globals: serde_json::Value,

    /// Docker tag override for `jib build --docker`.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "docker_image")]
    pub docker_image: Option<String>,

    /// Service-worker overrides (navigate fallback, glob patterns).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sw: Option<SwOverrides>,
}

/// Overrides for the generated service-worker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SwOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob_patterns: Option<Vec<String>>,
}

fn default_name() -> String {
    "app".to_string()
}

fn default_version() -> String {
    "0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_path() -> String {
    "/assets/".to_string()
}

fn default_log_file() -> String {
    "log/app.log".to_string()
}

fn default_globals() -> serde_json::Value {
    serde_json::json!({})
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            name: default_name(),
            version: default_version(),
            port: default_port(),
            public_path: default_public_path(),
            log_file: default_log_file(),
            globals: default_globals(),
            docker_image: None,
            sw: None,
        }
    }
}

impl AppConfig {
    /// The docker tag: explicit override, otherwise the package name.
    pub fn docker_tag(&self) -> &str {
        self.docker_image.as_deref().unwrap_or(&self.name)
    }
}
