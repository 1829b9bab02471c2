//! Desired configuration discovery and loading

use anyhow::{Context, Result};
use declarative::{DesiredConfig, DiffContext};
use std::path::{Path, PathBuf};

use crate::paths;

/// Base name of the default configuration file
pub const CONFIG_NAME: &str = "config";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Find `<name>.toml` or `<name>.json` in `dir`, preferring TOML.
pub fn find_config_file(dir: &Path, name: &str) -> Option<(PathBuf, ConfigFormat)> {
    [ConfigFormat::Toml, ConfigFormat::Json]
        .into_iter()
        .map(|format| (dir.join(format!("{name}.{}", format.extension())), format))
        .find(|(path, _)| path.is_file())
}

/// A parsed desired configuration and where it came from
#[derive(Debug)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub desired: DesiredConfig,
}

impl LoadedConfig {
    /// Load an explicit config file, or discover one in the config dir.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => paths::expand(&path.to_string_lossy()),
            None => default_config_file()?,
        };
        log::info!(
            "Loading {} config from {}",
            ConfigFormat::from_path(&path).extension(),
            path.display()
        );
        let desired = DesiredConfig::load(&path)?;
        Ok(Self { path, desired })
    }

    /// Directory relative sources and `.generated` are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn diff_context(&self, strict: bool) -> Result<DiffContext> {
        Ok(DiffContext::new(paths::home_dir()?, self.base_dir()).strict(strict))
    }
}

fn default_config_file() -> Result<PathBuf> {
    let dir = paths::config_dir()?;
    find_config_file(&dir, CONFIG_NAME)
        .map(|(path, _)| path)
        .with_context(|| {
            format!(
                "No configuration found in {} ({CONFIG_NAME}.toml or {CONFIG_NAME}.json); \
                 pass a path or set {}",
                dir.display(),
                paths::ENV_CONFIG_DIR
            )
        })
}
