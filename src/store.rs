//! Persistent library of named scripts.
//!
//! Each script is one `<name>.py` file under a configured root directory;
//! the file holds the raw script text with no header or metadata. Saves
//! overwrite on name collision; concurrent writers of the same name get
//! last-writer-wins.

use crate::env;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

/// Errors from script library operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Name or body failed validation; nothing was written
    #[error("validation failed: {0}")]
    Validation(String),
    /// No script with the given name exists
    #[error("no saved script named '{0}'")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores each script as one file under a root directory.
///
/// The root is created on first save; list/load/delete never create it.
pub struct ScriptStore {
    root: PathBuf,
}

impl ScriptStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Write (or overwrite) a named script.
    ///
    /// Rejects an empty name, a name that would escape the store
    /// directory, and an empty or whitespace-only body, in all cases
    /// before any filesystem side effect.
    pub async fn save(&self, name: &str, body: &str) -> Result<PathBuf, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("script name is empty".to_string()));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StoreError::Validation(format!(
                "script name '{name}' is not filesystem-safe"
            )));
        }
        if body.trim().is_empty() {
            return Err(StoreError::Validation("script body is empty".to_string()));
        }

        fs::create_dir_all(&self.root).await?;
        let path = env::script_file_path(&self.root, name);
        fs::write(&path, body).await?;
        info!(name, path = %path.display(), "saved script");
        Ok(path)
    }

    /// Names of all persisted scripts, in directory order.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(env::SCRIPT_FILE_EXTENSION)
                && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
            {
                names.push(stem.to_string());
            }
        }
        debug!(count = names.len(), "listed saved scripts");
        Ok(names)
    }

    /// Load a script's body.
    pub async fn load(&self, name: &str) -> Result<String, StoreError> {
        let path = env::script_file_path(&self.root, name);
        match fs::read_to_string(&path).await {
            Ok(body) => Ok(body),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a script. Absence is reported, not ignored.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = env::script_file_path(&self.root, name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(name, "deleted script");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
