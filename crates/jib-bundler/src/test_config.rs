//! Test-runner configuration assembly.
//!
//! The `jib test` command passes jest a fully assembled `--config` JSON blob
//! instead of relying on a config file in the project. Policy lives here;
//! the CLI only adds argv handling on top.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};

/// Fixed jest policy plus the caller's project roots.
#[derive(Debug, Clone)]
pub struct TestRunnerConfig {
    /// Project root; becomes jest's `rootDir`.
    pub root_dir: PathBuf,
    /// Source roots to scan for tests, relative to `root_dir`.
    pub src_roots: Vec<String>,
}

impl TestRunnerConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        TestRunnerConfig {
            root_dir: root_dir.into(),
            src_roots: vec!["src".to_string()],
        }
    }

    pub fn src_roots(mut self, roots: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.src_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Render the jest configuration object.
    pub fn to_json(&self) -> Value {
        let roots: Vec<String> = self
            .src_roots
            .iter()
            .map(|root| format!("<rootDir>/{}", root))
            .collect();

        let mut config = json!({
            "rootDir": self.root_dir.display().to_string(),
            "roots": roots,
            "collectCoverageFrom": ["src/**/*.{ts,js,tsx,jsx,mjs}"],
            "testMatch": [
                "**/__tests__/**/*.{ts,js,tsx,jsx,mjs}",
                "**/?(*.)(spec|test).{ts,js,tsx,jsx,mjs}",
            ],
            "coverageThreshold": {
                "global": {
                    "branches": 90,
                    "functions": 90,
                    "lines": 90,
                    "statements": 90
                }
            },
            "coverageReporters": ["lcov", "html"],
            "testEnvironment": "node",
            "testURL": "http://localhost",
            "moduleFileExtensions": [
                "web.js", "mjs", "ts", "js", "json", "web.jsx", "jsx", "tsx", "node",
            ],
            "testPathIgnorePatterns": [
                "/node_modules/",
                "<rootDir>/build/",
                "<rootDir>/public/",
            ],
            "coveragePathIgnorePatterns": [
                "/node_modules/",
                "<rootDir>/build/",
                "<rootDir>/public/",
                "<rootDir>/config/",
            ],
            "verbose": true,
        });

        // Jest refuses to start when a named setup file is missing, so only
        // reference the app's hook if it exists.
        if let Some(setup) = existing_setup_file(&self.root_dir) {
            config["setupFilesAfterEnv"] = json!([setup]);
        }

        config
    }

    /// Render as the single string jest's `--config` flag expects.
    pub fn to_config_arg(&self) -> String {
        self.to_json().to_string()
    }
}

fn existing_setup_file(root_dir: &Path) -> Option<String> {
    root_dir
        .join("jest-setup.js")
        .is_file()
        .then(|| "<rootDir>/jest-setup.js".to_string())
}
