//! Platform-specific paths for solder configuration.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/solder/` (Linux), `~/Library/Application Support/solder/` (macOS), `%APPDATA%\solder\` (Windows)
//!
//! # Example
//!
//! ```rust,no_run
//! use solder_config::paths;
//!
//! if let Some(path) = paths::find_config(None) {
//!     println!("Using settings from {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application name used for directory paths.
pub const APP_NAME: &str = "solder";

/// File name of the runtime settings document.
pub const CONFIG_FILE_NAME: &str = "solder.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default settings file path inside [`user_config_dir`].
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Find a settings file.
///
/// Searches in the following order:
/// 1. `explicit`, if given (a missing explicit file is not replaced by a fallback)
/// 2. `solder.toml` in the current directory
/// 3. [`default_config_path`]
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.is_file().then(|| path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    let user = default_config_path();
    user.is_file().then_some(user)
}

/// Creates the user configuration directory if it does not exist.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}
