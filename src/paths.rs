//! Centralized path resolution for mactide
//!
//! # Environment Variables
//!
//! - `MACTIDE_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/mactide`)
//! - `MACTIDE_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `MACTIDE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/mactide` (if set)
//! 3. `~/.config/mactide`
//!
//! For state_dir():
//! 1. `MACTIDE_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/mactide` (if set)
//! 3. `~/.local/state/mactide`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "MACTIDE_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "MACTIDE_STATE_DIR";

const APP_DIR: &str = "mactide";

/// File name of the persisted settings record
pub const RECORD_FILE: &str = "record.json";

/// Get the mactide config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let path = home_dir()?.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the mactide state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let path = home_dir()?.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Fixed location of the persisted settings record
pub fn record_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(RECORD_FILE))
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine home directory")
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
