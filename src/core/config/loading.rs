//! Locates and parses the TOML configuration file.

use super::file::ConfigFile;
use crate::core::error::{AppError, Result};
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_NAME: &str = "bulk-verify.toml";

/// Candidate configuration paths, in lookup order, used when no explicit path is given.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("bulk-verify")
                .join("config.toml"),
        );
    }
    paths
}

/// Loads the configuration file.
///
/// An explicit path must exist. Without one, the default locations are tried in
/// order and a missing file simply means "no file".
///
/// # Returns
/// * `Result<Option<(ConfigFile, PathBuf)>>` - The parsed file and where it came from.
pub fn load_config_file(explicit: Option<&Path>) -> Result<Option<(ConfigFile, PathBuf)>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(AppError::Config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }
        return parse_file(path).map(|file| Some((file, path.to_path_buf())));
    }

    for candidate in default_config_paths() {
        if candidate.is_file() {
            tracing::debug!("Found configuration file at {}", candidate.display());
            return parse_file(&candidate).map(|file| Some((file, candidate)));
        }
    }

    tracing::debug!("No configuration file found, using defaults");
    Ok(None)
}

fn parse_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)?;
    let file: ConfigFile = toml::from_str(&raw).map_err(|e| {
        AppError::Config(format!("Failed to parse '{}': {}", path.display(), e))
    })?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(file)
}
