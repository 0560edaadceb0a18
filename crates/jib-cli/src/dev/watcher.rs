//! Debounced file watching for the dev server.
//!
//! Watches the project root recursively and forwards relevant changes into
//! the orchestrator's channel, filtering out the build output, dependency
//! directories, logs, and hidden files so a rebuild never retriggers itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{DevError, DevResult};

/// A relevant filesystem change.
#[derive(Debug, Clone)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Suppresses repeat events for the same path inside the debounce window.
///
/// Editors fire bursts of events per save; events for different paths never
/// suppress each other.
struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Debouncer {
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Whether an event for `path` at `now` should pass through.
    fn admit(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_seen.get(path) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        self.last_seen.insert(path.to_path_buf(), now);
        true
    }
}

/// Recursive watcher with per-path debouncing.
pub struct FileWatcher {
    // Dropping the watcher stops the notify backend.
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root`, ignoring `ignore_patterns` (directory names or `*.ext`
    /// suffixes), debouncing repeat events per path within `debounce_ms`.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> DevResult<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(DevError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("watch root does not exist: {}", root.display()),
            )));
        }

        let (tx, rx) = mpsc::channel(100);

        let mut debouncer = Debouncer::new(Duration::from_millis(debounce_ms));
        let patterns = ignore_patterns.clone();
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };

            for path in &event.paths {
                if Self::should_ignore(path, &watch_root, &patterns) {
                    continue;
                }

                if !debouncer.admit(path, Instant::now()) {
                    continue;
                }

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        // Never react to anything outside the watched root.
        if !path.starts_with(root) {
            return true;
        }
        let Ok(rel_path) = path.strip_prefix(root) else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();
        for pattern in ignore_patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if path_str.starts_with(pattern.as_str())
                || path_str.contains(&format!("/{}", pattern))
            {
                return true;
            }
        }

        // Hidden files and directories (.git, .env, editor droppings).
        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }
}

/// The ignore set `jib start` watches with: everything the toolchain itself
/// writes, plus dependency trees.
pub fn default_ignores() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        "build".to_string(),
        "log".to_string(),
        "*.log".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_is_tracked_per_path() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();

        assert!(debouncer.admit(Path::new("src/a.ts"), start));
        // A different path inside a's window is not suppressed.
        assert!(debouncer.admit(Path::new("src/b.ts"), start + Duration::from_millis(10)));

        // Repeats inside each path's own window are.
        assert!(!debouncer.admit(Path::new("src/a.ts"), start + Duration::from_millis(50)));
        assert!(!debouncer.admit(Path::new("src/b.ts"), start + Duration::from_millis(50)));

        // Once the window passes, the path fires again.
        assert!(debouncer.admit(Path::new("src/a.ts"), start + Duration::from_millis(150)));
        assert!(debouncer.admit(Path::new("src/b.ts"), start + Duration::from_millis(150)));
    }

    #[test]
    fn ignores_build_output_and_dependencies() {
        let root = PathBuf::from("/project");
        let patterns = default_ignores();

        for ignored in [
            "/project/node_modules/react/index.js",
            "/project/build/server.js",
            "/project/build/public/assets/client.js",
            "/project/log/app.log",
            "/project/debug.log",
        ] {
            assert!(
                FileWatcher::should_ignore(Path::new(ignored), &root, &patterns),
                "{} should be ignored",
                ignored
            );
        }

        assert!(!FileWatcher::should_ignore(
            Path::new("/project/src/server.ts"),
            &root,
            &patterns
        ));
    }

    #[test]
    fn ignores_hidden_files() {
        let root = PathBuf::from("/project");
        let patterns = vec![];

        assert!(FileWatcher::should_ignore(
            Path::new("/project/.git/HEAD"),
            &root,
            &patterns
        ));
        assert!(FileWatcher::should_ignore(
            Path::new("/project/src/.swap/file.ts"),
            &root,
            &patterns
        ));
        assert!(!FileWatcher::should_ignore(
            Path::new("/project/src/client.tsx"),
            &root,
            &patterns
        ));
    }

    #[test]
    fn ignores_paths_outside_the_root() {
        assert!(FileWatcher::should_ignore(
            Path::new("/elsewhere/file.ts"),
            Path::new("/project"),
            &[]
        ));
    }

    #[tokio::test]
    async fn delivers_changes_for_watched_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let (_watcher, mut rx) =
            FileWatcher::new(dir.path().to_path_buf(), default_ignores(), 10).unwrap();

        std::fs::write(dir.path().join("src/server.ts"), "export {};\n").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher should deliver the change")
            .unwrap();
        assert!(change.path().ends_with("server.ts"));
    }
}
