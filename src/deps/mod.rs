//! Dependency surface resolution for generated scripts.
//!
//! [`scan`] derives the set of imported module names from source text
//! without running it; [`PackageInstaller`] makes sure every member of
//! that set is importable before execution is allowed to proceed.

pub mod installer;
pub mod scan;

pub use installer::{InstallHostError, ModuleHost, PackageInstaller, PipHost};
pub use scan::scan;

use serde::{Deserialize, Serialize};

/// Outcome of ensuring one module is importable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallOutcome {
    /// The module was missing and a same-named package was installed
    Installed,
    /// The module already resolved in the host environment
    AlreadyPresent,
    /// Installation was attempted and failed; carries the manager's error text
    Failed(String),
}

impl InstallOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, InstallOutcome::Failed(_))
    }
}
