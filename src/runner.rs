//! Generated-script execution with timing and fault capture.
//!
//! The runner measures wall-clock time around the run and converts every
//! fault (a spawn failure or a nonzero exit) into data on the report
//! instead of propagating it, so a failing generated script never takes
//! the host down with it. Execution carries the caller's full privileges
//! and is not time-boxed; [`ScriptRunner`] is the seam where an
//! out-of-process sandbox could later be swapped in without touching the
//! rest of the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

/// Outcome of running one generated script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Whether the script ran to completion
    pub succeeded: bool,
    /// Description of the fault when the run failed
    pub fault: Option<String>,
    /// Wall-clock time spent running; reported even on failure
    pub duration: Duration,
    /// Captured standard output, for the results sink
    pub stdout: String,
}

/// Strategy seam for executing generated scripts.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run the script text, capturing any fault instead of propagating it.
    async fn run(&self, code: &str) -> ExecutionReport;
}

/// Runs scripts with the host interpreter, staged through a temp file.
#[derive(Debug, Clone)]
pub struct HostRunner {
    interpreter: PathBuf,
}

impl HostRunner {
    pub fn new(interpreter: PathBuf) -> Self {
        Self { interpreter }
    }
}

#[async_trait]
impl ScriptRunner for HostRunner {
    async fn run(&self, code: &str) -> ExecutionReport {
        let start = Instant::now();

        let script = match stage_script(code) {
            Ok(file) => file,
            Err(err) => {
                return fault_report(start, format!("failed to stage script: {err}"));
            }
        };

        debug!(path = %script.path().display(), "running generated script");
        let output = Command::new(&self.interpreter)
            .arg(script.path())
            .output()
            .await;
        let duration = start.elapsed();

        match output {
            Ok(output) if output.status.success() => {
                info!(?duration, "script completed");
                ExecutionReport {
                    succeeded: true,
                    fault: None,
                    duration,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                }
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let fault = if stderr.trim().is_empty() {
                    format!("script exited with status {}", output.status)
                } else {
                    stderr.trim().to_string()
                };
                info!(?duration, "script raised a fault");
                ExecutionReport {
                    succeeded: false,
                    fault: Some(fault),
                    duration,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                }
            }
            Err(err) => fault_report(start, format!("failed to start interpreter: {err}")),
        }
    }
}

fn fault_report(start: Instant, fault: String) -> ExecutionReport {
    ExecutionReport {
        succeeded: false,
        fault: Some(fault),
        duration: start.elapsed(),
        stdout: String::new(),
    }
}

/// Write the script to a temp file the interpreter can read.
fn stage_script(code: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("taskomat-")
        .suffix(".py")
        .tempfile()?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The tests drive the runner with `sh` so they stay hermetic on hosts
    // without a Python toolchain.
    #[cfg(unix)]
    fn shell_runner() -> HostRunner {
        HostRunner::new(PathBuf::from("sh"))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_run_reports_output_and_duration() {
        let report = shell_runner().run("echo hello").await;

        assert!(report.succeeded);
        assert!(report.fault.is_none());
        assert!(report.stdout.contains("hello"));
        assert!(report.duration > Duration::ZERO);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_run_captures_the_fault_without_panicking() {
        let report = shell_runner().run("echo broken >&2\nexit 3").await;

        assert!(!report.succeeded);
        let fault = report.fault.expect("fault should be captured");
        assert!(fault.contains("broken"));
        assert!(report.duration > Duration::ZERO);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_interpreter_is_a_fault_not_a_crash() {
        let runner = HostRunner::new(PathBuf::from("/definitely/not/an/interpreter"));
        let report = runner.run("print('hi')").await;

        assert!(!report.succeeded);
        assert!(report.fault.unwrap().contains("failed to start interpreter"));
    }
}
