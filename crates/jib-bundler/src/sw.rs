//! Service-worker generation.
//!
//! When `GENERATE_SW` is set at build time, jib assembles a workbox
//! `generateSW` configuration and shells out to `npx workbox-cli`. The config
//! is staged as a CommonJS module rather than JSON so the regex-valued
//! options survive.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::target::BuildEnv;
use crate::{Error, Result};

/// Assembled workbox `generateSW` options.
#[derive(Debug, Clone)]
pub struct ServiceWorkerConfig {
    /// `<package>@<version>`, versioning the precache.
    pub cache_id: String,
    /// Where the worker script lands (build root).
    pub sw_dest: PathBuf,
    /// Directory globbed for precache candidates.
    pub glob_directory: PathBuf,
    pub glob_patterns: Vec<String>,
    /// Source maps and font files never belong in the precache.
    pub glob_ignores: Vec<String>,
    pub navigate_fallback: String,
    /// Extra worker scripts, from `SW_IMPORTS`.
    pub import_scripts: Vec<String>,
    /// Runtime cache name for the network-first route.
    pub offline_cache: String,
}

impl ServiceWorkerConfig {
    /// Assemble from the environment snapshot; `None` unless `GENERATE_SW`.
    pub fn from_env(
        package_name: &str,
        package_version: &str,
        public_dir: &Path,
        build_dir: &Path,
        env: &BuildEnv,
    ) -> Option<Self> {
        if !env.generate_sw {
            return None;
        }

        let import_scripts = env
            .sw_imports
            .as_deref()
            .map(|imports| {
                imports
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some(ServiceWorkerConfig {
            cache_id: format!("{}@{}", package_name, package_version),
            sw_dest: build_dir.join("serviceworker.js"),
            glob_directory: public_dir.to_path_buf(),
            glob_patterns: vec!["*.{js,ico,png,html,css}".to_string()],
            glob_ignores: vec![
                "**/*.map".to_string(),
                "**/*.{ttf,woff,woff2,eot}".to_string(),
            ],
            navigate_fallback: "/".to_string(),
            import_scripts,
            offline_cache: format!("{}-offline", package_name),
        })
    }

    /// Render the workbox config module.
    pub fn to_config_js(&self) -> String {
        let js = |value: &str| serde_json::Value::String(value.to_string()).to_string();
        let js_list = |values: &[String]| {
            serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
        };

        let mut out = String::from("// Generated by jib - do not edit.\nmodule.exports = {\n");
        out.push_str(&format!("  cacheId: {},\n", js(&self.cache_id)));
        out.push_str(&format!("  swDest: {},\n", js(&self.sw_dest.display().to_string())));
        out.push_str(&format!(
            "  globDirectory: {},\n",
            js(&self.glob_directory.display().to_string())
        ));
        out.push_str(&format!("  globPatterns: {},\n", js_list(&self.glob_patterns)));
        out.push_str(&format!("  globIgnores: {},\n", js_list(&self.glob_ignores)));
        out.push_str("  clientsClaim: true,\n  skipWaiting: true,\n");
        out.push_str("  ignoreURLParametersMatching: [/./],\n");
        out.push_str(&format!(
            "  navigateFallback: {},\n",
            js(&self.navigate_fallback)
        ));
        if !self.import_scripts.is_empty() {
            out.push_str(&format!(
                "  importScripts: {},\n",
                js_list(&self.import_scripts)
            ));
        }
        out.push_str(&format!(
            "  runtimeCaching: [{{\n    urlPattern: /\\/.*/,\n    handler: \"NetworkFirst\",\n    options: {{\n      cacheName: {},\n      cacheableResponse: {{ statuses: [0, 200] }}\n    }}\n  }}]\n",
            js(&self.offline_cache)
        ));
        out.push_str("};\n");
        out
    }

    /// Stage the config and run `npx workbox-cli generateSW`.
    ///
    /// Returns the path of the generated worker script.
    pub async fn generate(&self) -> Result<PathBuf> {
        let npx = which::which("npx").map_err(|_| Error::ToolNotFound { name: "npx" })?;

        let mut staged = tempfile::Builder::new()
            .prefix("jib-workbox-")
            .suffix(".cjs")
            .tempfile()
            .map_err(|e| Error::io_context("failed to stage workbox config", e))?;
        staged
            .write_all(self.to_config_js().as_bytes())
            .map_err(|e| Error::io_context("failed to write workbox config", e))?;

        debug!(config = %staged.path().display(), "running workbox generateSW");
        let output = tokio::process::Command::new(&npx)
            .arg("workbox-cli")
            .arg("generateSW")
            .arg(staged.path())
            .output()
            .await
            .map_err(|e| Error::io_context("failed to spawn npx", e))?;

        if !output.status.success() {
            return Err(Error::Tool {
                name: "workbox-cli",
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(dest = %self.sw_dest.display(), "service worker generated");
        Ok(self.sw_dest.clone())
    }
}
