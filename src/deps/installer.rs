//! Package availability checks and installation via the host toolchain.
//!
//! The host interface is a trait so the pipeline can be exercised without
//! touching a real interpreter; the production [`PipHost`] probes module
//! resolvability through `importlib` and installs with `pip`. No version
//! pinning, no retry, no rollback: each module is independent.

use super::InstallOutcome;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// `importlib` probe run with the module name as `sys.argv[1]`.
const RESOLVE_PROBE: &str =
    "import importlib.util, sys; sys.exit(0 if importlib.util.find_spec(sys.argv[1]) else 1)";

/// Host interface for module resolvability and package installation.
#[async_trait]
pub trait ModuleHost: Send + Sync {
    /// Whether `module` already resolves in the host environment.
    async fn is_resolvable(&self, module: &str) -> bool;

    /// Install a package named after `module`. `Err` carries the package
    /// manager's error text.
    async fn install(&self, module: &str) -> Result<(), String>;
}

/// Errors locating the host toolchain.
#[derive(Debug, thiserror::Error)]
pub enum InstallHostError {
    #[error("no python interpreter found on PATH (tried python3, python)")]
    InterpreterNotFound,
}

/// Locate the host Python interpreter.
pub fn discover_python() -> Result<PathBuf, InstallHostError> {
    which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|_| InstallHostError::InterpreterNotFound)
}

/// Resolves modules through the host interpreter and installs with pip.
#[derive(Debug, Clone)]
pub struct PipHost {
    python: PathBuf,
}

impl PipHost {
    pub fn new(python: PathBuf) -> Self {
        Self { python }
    }

    /// Build a host around the interpreter found on PATH.
    pub fn discover() -> Result<Self, InstallHostError> {
        discover_python().map(Self::new)
    }
}

#[async_trait]
impl ModuleHost for PipHost {
    async fn is_resolvable(&self, module: &str) -> bool {
        let status = Command::new(&self.python)
            .arg("-c")
            .arg(RESOLVE_PROBE)
            .arg(module)
            .status()
            .await;
        matches!(status, Ok(code) if code.success())
    }

    async fn install(&self, module: &str) -> Result<(), String> {
        let output = Command::new(&self.python)
            .args(["-m", "pip", "install"])
            .arg(module)
            .output()
            .await
            .map_err(|err| format!("failed to spawn pip: {err}"))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(summarize_stderr(&String::from_utf8_lossy(&output.stderr)))
        }
    }
}

/// Last meaningful stderr line; pip buries the cause at the end.
fn summarize_stderr(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("package manager reported no error detail")
        .to_string()
}

/// Ensures every scanned dependency is importable before execution.
pub struct PackageInstaller {
    host: Arc<dyn ModuleHost>,
}

impl PackageInstaller {
    pub fn new(host: Arc<dyn ModuleHost>) -> Self {
        Self { host }
    }

    /// Ensure a single module is importable.
    ///
    /// Already-resolvable modules return without side effects; otherwise
    /// the package manager is invoked once for a same-named package.
    pub async fn ensure(&self, module: &str) -> InstallOutcome {
        if self.host.is_resolvable(module).await {
            debug!(module, "module already resolvable");
            return InstallOutcome::AlreadyPresent;
        }

        info!(module, "module not resolvable, attempting install");
        match self.host.install(module).await {
            Ok(()) => {
                info!(module, "package installed");
                InstallOutcome::Installed
            }
            Err(reason) => {
                warn!(module, %reason, "package install failed");
                InstallOutcome::Failed(reason)
            }
        }
    }

    /// Apply [`PackageInstaller::ensure`] to every member of the set.
    ///
    /// The returned map covers the full set even when installs fail, so
    /// callers can report every outcome; any `Failed` entry is reason to
    /// skip execution entirely.
    pub async fn ensure_all(
        &self,
        modules: &BTreeSet<String>,
    ) -> BTreeMap<String, InstallOutcome> {
        let mut outcomes = BTreeMap::new();
        for module in modules {
            let outcome = self.ensure(module).await;
            outcomes.insert(module.clone(), outcome);
        }
        outcomes
    }
}
