//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./taskomat.toml or ./.taskomat/config.toml
//! 2. User config: ~/.taskomat/config.toml
//! 3. Built-in defaults
//!
//! The record is read once at startup and rewritten whenever a setting
//! changes.

use crate::env;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini API key; falls back to the API_KEY environment variable
    pub api_key: Option<String>,
    /// Directory scripts are saved under; defaults to ~/.taskomat/scripts
    pub script_save_location: Option<PathBuf>,
    /// Model identifier used for generation requests
    pub model: String,
    /// Requests per minute the rate display warns at (advisory)
    pub requests_per_minute: u32,
    /// Keyboard shortcut bindings, persisted for the presentation layer
    pub keyboard_shortcuts: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut keyboard_shortcuts = BTreeMap::new();
        keyboard_shortcuts.insert("run".to_string(), "Ctrl+Return".to_string());
        keyboard_shortcuts.insert("save".to_string(), "Ctrl+S".to_string());
        keyboard_shortcuts.insert("clear".to_string(), "Ctrl+L".to_string());

        Self {
            api_key: None,
            script_save_location: None,
            model: env::DEFAULT_MODEL.to_string(),
            requests_per_minute: 60,
            keyboard_shortcuts,
        }
    }
}

impl AppConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// API key from the config record or the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std_env::var(env::API_KEY_ENV_VAR).ok())
    }

    /// Directory the script store is rooted at.
    pub fn scripts_root(&self) -> PathBuf {
        if let Some(location) = &self.script_save_location {
            return location.clone();
        }
        match ConfigDiscovery::get_home_dir() {
            Some(home) => env::scripts_dir_path(&home),
            None => env::scripts_dir_path(Path::new(".")),
        }
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return AppConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(AppConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = Self::get_config_candidates();

        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.exists() && candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        // 1. Current directory: ./taskomat.toml or ./.taskomat/config.toml
        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join("taskomat.toml"));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        // 2. User config: ~/.taskomat/config.toml
        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        candidates
    }

    /// Get home directory path
    pub fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Create a default config file in the user's home directory
    pub fn create_default_user_config() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home_dir = Self::get_home_dir().ok_or("Could not determine home directory")?;

        let config_dir = env::user_config_dir_path(&home_dir);
        let config_path = env::user_config_file_path(&home_dir);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if !config_path.exists() {
            let default_config = AppConfig::default();
            default_config.to_toml_file(&config_path)?;
            info!("Created default configuration file: {:?}", config_path);
        } else {
            warn!("Configuration file already exists: {:?}", config_path);
        }

        Ok(config_path)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        let candidates = Self::get_config_candidates();
        for (i, candidate) in candidates.iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn toml_roundtrip_preserves_all_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.api_key = Some("test-key".to_string());
        config.script_save_location = Some(PathBuf::from("/tmp/scripts"));
        config.requests_per_minute = 15;

        config.to_toml_file(&path).unwrap();
        let loaded = AppConfig::from_toml_file(&path).unwrap();

        assert_eq!(loaded.api_key, Some("test-key".to_string()));
        assert_eq!(loaded.script_save_location, Some(PathBuf::from("/tmp/scripts")));
        assert_eq!(loaded.model, env::DEFAULT_MODEL);
        assert_eq!(loaded.requests_per_minute, 15);
        assert_eq!(loaded.keyboard_shortcuts, config.keyboard_shortcuts);
    }

    #[test]
    fn explicit_script_location_wins() {
        let config = AppConfig {
            script_save_location: Some(PathBuf::from("/data/scripts")),
            ..AppConfig::default()
        };
        assert_eq!(config.scripts_root(), PathBuf::from("/data/scripts"));
    }

    #[test]
    fn blank_configured_key_falls_through() {
        let config = AppConfig {
            api_key: Some("   ".to_string()),
            ..AppConfig::default()
        };
        // Resolution falls back to the environment, which may or may not
        // be set; the configured blank must not be returned either way.
        assert_ne!(config.resolve_api_key(), Some("   ".to_string()));
    }
}
