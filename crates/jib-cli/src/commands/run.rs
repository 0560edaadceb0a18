//! Task timing and child exit-status forwarding.
//!
//! In-process tasks (`build`, `start`) run inside [`run_task`], which prints
//! timestamped start/finish lines around the task. Child-process tasks
//! (`test`, `serve`) hand their finished [`ExitStatus`] to [`forward_status`],
//! which mirrors the child's exit code and turns signal deaths into exit 1
//! with a diagnostic naming the likely cause.

use std::process::{ExitCode, ExitStatus};
use std::time::Instant;

use chrono::Local;
use owo_colors::OwoColorize;

use crate::error::Result;
use crate::ui;

/// Run a task, bracketed with timestamped progress lines.
///
/// The finish line only appears on success; a failed task is reported once,
/// as a diagnostic at the binary edge.
pub async fn run_task<T>(name: &str, task: impl Future<Output = Result<T>>) -> Result<T> {
    let started = Instant::now();
    eprintln!(
        "[{}] Starting '{}'...",
        Local::now().format("%H:%M:%S"),
        name.cyan()
    );

    let result = task.await;

    if result.is_ok() {
        eprintln!(
            "[{}] Finished '{}' after {} ms",
            Local::now().format("%H:%M:%S"),
            name.cyan(),
            started.elapsed().as_millis()
        );
    }

    result
}

/// Mirror a finished child's exit status as our own exit code.
///
/// Exited children pass their code through unchanged. A child killed by a
/// signal exits 1, with SIGKILL and SIGTERM explained since they usually
/// mean the machine (OOM killer) or an operator intervened rather than the
/// tool itself failing.
pub fn forward_status(status: ExitStatus) -> ExitCode {
    ExitCode::from(exit_code_for(status))
}

fn exit_code_for(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code).unwrap_or(1);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        match status.signal() {
            // SIGKILL
            Some(9) => ui::error(
                "The process exited too early. This probably means the system \
                 ran out of memory or someone called `kill -9` on the process.",
            ),
            // SIGTERM
            Some(15) => ui::error(
                "The process exited too early. Someone might have called `kill` \
                 or `killall`, or the system could be shutting down.",
            ),
            Some(signal) => ui::error(&format!("The process was killed by signal {}.", signal)),
            None => {}
        }
    }

    1
}
