//! esbuild child-process driver.
//!
//! Bundling is delegated to the esbuild binary rather than linked in; the
//! driver locates it on PATH, renders a [`BundleConfig`] into an argument
//! vector, runs one compile to completion, and reads the metafile back for
//! stats and manifest generation.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::BundleConfig;
use crate::metafile::Metafile;
use crate::target::TargetKind;
use crate::{Error, Result};

/// Handle to a located esbuild binary.
#[derive(Debug, Clone)]
pub struct Esbuild {
    binary: PathBuf,
}

/// One emitted artifact, taken from the metafile.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of a single successful compile.
#[derive(Debug)]
pub struct CompileStats {
    pub target: TargetKind,
    pub duration: Duration,
    pub output_files: Vec<OutputFile>,
    pub metafile: Metafile,
}

impl Esbuild {
    /// Find esbuild on PATH.
    pub fn locate() -> Result<Self> {
        let binary = which::which("esbuild").map_err(|_| Error::ToolNotFound { name: "esbuild" })?;
        debug!(binary = %binary.display(), "located esbuild");
        Ok(Esbuild { binary })
    }

    /// Use an explicit binary path instead of searching PATH.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Esbuild {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run one compile to completion.
    ///
    /// Creates the output directory first; esbuild refuses to write into a
    /// missing parent. A non-zero exit becomes [`Error::Compile`] carrying
    /// the bundler's stderr verbatim.
    pub async fn compile(&self, config: &BundleConfig) -> Result<CompileStats> {
        let out_parent = config
            .outfile
            .as_deref()
            .and_then(Path::parent)
            .or(config.outdir.as_deref());
        if let Some(dir) = out_parent {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::io_context(format!("failed to create output dir {}", dir.display()), e)
            })?;
        }

        let args = config.to_args();
        debug!(target = %config.target, ?args, "running esbuild");

        let started = Instant::now();
        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::io_context(format!("failed to spawn {}", self.binary.display()), e))?;
        let duration = started.elapsed();

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(Error::Compile {
                target: config.target,
                stderr,
            });
        }
        if !stderr.is_empty() {
            // Warnings still land on stderr when the compile succeeds.
            warn!(target = %config.target, "{}", stderr);
        }

        let metafile = Metafile::from_path(&config.metafile)?;
        let output_files = metafile
            .outputs
            .iter()
            .map(|(path, output)| OutputFile {
                path: PathBuf::from(path),
                bytes: output.bytes,
            })
            .collect();

        Ok(CompileStats {
            target: config.target,
            duration,
            output_files,
            metafile,
        })
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::config::BundleInputs;
    use crate::target::BuildEnv;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_esbuild(dir: &TempDir, script: &str) -> PathBuf {
        let path = dir.path().join("esbuild");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn server_config(dir: &TempDir) -> BundleConfig {
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/server.ts"), "export {};\n").unwrap();
        let inputs = BundleInputs::new(dir.path().join("src"), dir.path().join("build"));
        BundleConfig::server(&inputs, &BuildEnv::default()).unwrap()
    }

    #[tokio::test]
    async fn failing_compile_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let binary = fake_esbuild(&dir, "#!/bin/sh\necho 'src/server.ts: error TS1' >&2\nexit 1\n");
        let config = server_config(&dir);

        let err = Esbuild::with_binary(binary).compile(&config).await.unwrap_err();
        match err {
            Error::Compile { target, stderr } => {
                assert_eq!(target, TargetKind::Server);
                assert!(stderr.contains("error TS1"));
            }
            other => panic!("expected Compile error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn successful_compile_reads_metafile() {
        let dir = TempDir::new().unwrap();
        let script = r#"#!/bin/sh
for a in "$@"; do
  case "$a" in
    --metafile=*)
      printf '%s' '{"inputs":{},"outputs":{"build/server.js":{"bytes":42}}}' > "${a#--metafile=}"
      ;;
  esac
done
exit 0
"#;
        let binary = fake_esbuild(&dir, script);
        let config = server_config(&dir);

        let stats = Esbuild::with_binary(binary).compile(&config).await.unwrap();
        assert_eq!(stats.target, TargetKind::Server);
        assert_eq!(stats.output_files.len(), 1);
        assert_eq!(stats.output_files[0].bytes, 42);
        assert!(stats.output_files[0].path.ends_with("server.js"));
    }
}
