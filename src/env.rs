//! Environment constants and path utilities for taskomat.
//!
//! This module centralizes all hardcoded paths and directory names used throughout
//! the application, making them easier to maintain and modify.

/// Main application directory name (hidden directory like .git, .vscode)
pub const TASKOMAT_DIR_NAME: &str = ".taskomat";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Saved-scripts directory name within .taskomat
pub const SCRIPTS_DIR_NAME: &str = "scripts";

/// File extension for saved scripts
pub const SCRIPT_FILE_EXTENSION: &str = "py";

/// Default Gemini model identifier
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV_VAR: &str = "API_KEY";

/// Common path utilities
use std::path::{Path, PathBuf};

/// Build the main .taskomat directory path from a base directory
pub fn taskomat_dir_path(base: &Path) -> PathBuf {
    base.join(TASKOMAT_DIR_NAME)
}

/// Build the saved-scripts directory path from a base directory
pub fn scripts_dir_path(base: &Path) -> PathBuf {
    taskomat_dir_path(base).join(SCRIPTS_DIR_NAME)
}

/// Build the path of a saved script file inside a store root
pub fn script_file_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{}.{}", name, SCRIPT_FILE_EXTENSION))
}

/// Build config directory path in the user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(TASKOMAT_DIR_NAME)
}

/// Build config file path in the user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in the current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(TASKOMAT_DIR_NAME).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_file_path_appends_extension() {
        let path = script_file_path(Path::new("/tmp/scripts"), "backup");
        assert_eq!(path, PathBuf::from("/tmp/scripts/backup.py"));
    }

    #[test]
    fn config_paths_nest_under_app_dir() {
        let home = Path::new("/home/user");
        assert_eq!(
            user_config_file_path(home),
            PathBuf::from("/home/user/.taskomat/config.toml")
        );
    }
}
