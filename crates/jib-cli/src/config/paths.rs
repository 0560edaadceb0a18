//! Project layout resolution.
//!
//! All filesystem paths the tasks consume are derived once from the project
//! root and carried in a [`ProjectPaths`] value, instead of resolving ad hoc
//! throughout the commands.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Resolved project layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Project root.
    pub root: PathBuf,
    /// Source directory holding the entry files.
    pub src: PathBuf,
    /// Static assets copied into the build output.
    pub public: PathBuf,
    /// Build output root.
    pub build: PathBuf,
    /// Browser bundle output, served under the public path.
    pub build_public: PathBuf,
    /// The server-rendering bundle.
    pub server_bundle: PathBuf,
    /// jib.config.json location.
    pub config_file: PathBuf,
    /// .env file loaded by the production server.
    pub dotenv: PathBuf,
}

impl ProjectPaths {
    /// Derive the layout from a project root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        ProjectPaths {
            src: root.join("src"),
            public: root.join("public"),
            build: root.join("build"),
            build_public: root.join("build").join("public"),
            server_bundle: root.join("build").join("server.js"),
            config_file: root.join("jib.config.json"),
            dotenv: root.join(".env"),
            root,
        }
    }

    /// Resolve the project root and derive the layout.
    ///
    /// Resolution order: explicit `--root` flag, then `JIB_ROOT`, then the
    /// nearest ancestor of the current directory holding `jib.config.json`
    /// or `package.json`, then the current directory itself.
    pub fn resolve(explicit_root: Option<&Path>) -> Result<Self> {
        let root = if let Some(root) = explicit_root {
            if !root.is_dir() {
                return Err(ConfigError::RootNotFound(root.to_path_buf()).into());
            }
            root.to_path_buf()
        } else if let Some(root) = std::env::var_os("JIB_ROOT") {
            let root = PathBuf::from(root);
            if !root.is_dir() {
                return Err(ConfigError::RootNotFound(root).into());
            }
            root
        } else {
            let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
            find_marker_root(&cwd).unwrap_or(cwd)
        };

        // Resolve symlinks so the watcher and bundler agree on paths.
        let root = root.canonicalize().map_err(ConfigError::Io)?;
        Ok(ProjectPaths::new(root))
    }

    /// The log file path for a relative name from the configuration.
    pub fn log_file(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Walk up from `start` looking for a directory holding a project marker.
fn find_marker_root(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let has_marker =
            dir.join("jib.config.json").is_file() || dir.join("package.json").is_file();
        has_marker.then(|| dir.to_path_buf())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn layout_derives_from_root() {
        let paths = ProjectPaths::new("/proj");
        assert_eq!(paths.src, PathBuf::from("/proj/src"));
        assert_eq!(paths.build_public, PathBuf::from("/proj/build/public"));
        assert_eq!(paths.server_bundle, PathBuf::from("/proj/build/server.js"));
        assert_eq!(paths.log_file("log/app.log"), PathBuf::from("/proj/log/app.log"));
    }

    #[test]
    fn explicit_root_must_exist() {
        let err = ProjectPaths::resolve(Some(Path::new("/no/such/dir"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn marker_search_finds_nearest_ancestor() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), "{}").unwrap();
        let nested = root.join("src").join("pages");
        fs::create_dir_all(&nested).unwrap();

        let found = find_marker_root(&nested).unwrap();
        assert_eq!(found, root);
    }

    #[test]
    fn marker_search_prefers_jib_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("jib.config.json"), "{}").unwrap();

        let found = find_marker_root(root).unwrap();
        assert_eq!(found, root);
    }
}
