//! Desired state - the user's declarative document
//!
//! Parsed strictly (unknown fields are rejected) from TOML or JSON, then
//! validated. Any failure here is fatal to the run.

use crate::error::{Error, Result};
use crate::value::{Value, ValueType, check_compatible};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Immutable per-run snapshot of what the workstation should look like.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredConfig {
    #[serde(default)]
    pub brew: BrewSection,
    #[serde(default)]
    pub appstore: AppStoreSection,
    #[serde(default)]
    pub macos: MacOSSection,
    #[serde(default)]
    pub git: GitSection,
    #[serde(default)]
    pub files: FilesSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrewSection {
    /// Formulae, in declaration order
    #[serde(default)]
    pub packages: Vec<String>,
    /// Casks, in declaration order
    #[serde(default)]
    pub casks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppStoreSection {
    #[serde(default)]
    pub apps: Vec<AppStoreApp>,
}

/// A Mac App Store application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppStoreApp {
    /// Numeric App Store id
    pub id: u64,
    /// Display name
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacOSSection {
    #[serde(default)]
    pub settings: Vec<Setting>,
    /// Exact set of persistent Dock apps, when declared
    #[serde(default)]
    pub dock: Vec<DockApp>,
    /// Desktop picture path
    #[serde(default)]
    pub wallpaper: Option<String>,
}

/// A preference key in a settings domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Setting {
    pub domain: String,
    pub key: String,
    pub value: Value,
    /// Explicit wire type; inferred from `value` when absent
    #[serde(default, rename = "type")]
    pub value_type: Option<ValueType>,
}

impl Setting {
    pub fn identity(&self) -> SettingKey {
        SettingKey::new(&self.domain, &self.key)
    }
}

/// `(domain, key)` identity of a setting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettingKey {
    pub domain: String,
    pub key: String,
}

impl SettingKey {
    pub fn new(domain: &str, key: &str) -> Self {
        Self {
            domain: domain.to_string(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.key)
    }
}

/// A persistent Dock app: a bare name (`Safari`) or an app bundle path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockApp {
    pub name: String,
    /// 1-based Dock position
    #[serde(default)]
    pub position: Option<usize>,
}

impl DockApp {
    /// Identity as listed by the Dock (bundle stem for `.app` paths).
    pub fn label(&self) -> String {
        match self.name.strip_suffix(".app") {
            Some(path) => path.rsplit('/').next().unwrap_or(path).to_string(),
            None => self.name.clone(),
        }
    }

    /// Bundle path handed to the Dock tool.
    pub fn bundle_path(&self) -> String {
        if self.name.ends_with(".app") {
            self.name.clone()
        } else {
            format!("/Applications/{}.app", self.name)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSection {
    #[serde(default)]
    pub settings: Vec<GitSetting>,
}

/// Version-control configuration scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitScope {
    Global,
    System,
    Local,
}

impl GitScope {
    /// Flag for `git config`.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Global => "--global",
            Self::System => "--system",
            Self::Local => "--local",
        }
    }
}

impl fmt::Display for GitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Global => "global",
            Self::System => "system",
            Self::Local => "local",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSetting {
    pub scope: GitScope,
    pub key: String,
    pub value: String,
}

impl GitSetting {
    pub fn identity(&self) -> GitKey {
        GitKey {
            scope: self.scope,
            key: self.key.clone(),
        }
    }
}

/// `scope.key` identity of a git setting
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GitKey {
    pub scope: GitScope,
    pub key: String,
}

impl fmt::Display for GitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesSection {
    #[serde(default)]
    pub files: Vec<ManagedFile>,
}

/// A file generated from `source` and symlinked at `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedFile {
    /// Source path, relative to the configuration directory
    pub source: String,
    /// Symlink location (`~` allowed)
    pub target: String,
    /// Move an existing regular file aside before linking
    #[serde(default)]
    pub backup: bool,
}

impl DesiredConfig {
    /// Load and validate a configuration document.
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(path, format!("could not read file: {e}")))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
        .map_err(|message| Error::config(path, message))?;

        config
            .validate()
            .map_err(|message| Error::config(path, message))?;

        log::debug!("Loaded desired configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("invalid TOML: {e}"))
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))
    }

    /// Validate the parsed document beyond what the schema enforces.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for name in self.brew.packages.iter().chain(&self.brew.casks) {
            if name.trim().is_empty() {
                return Err("brew package and cask names cannot be empty".to_string());
            }
        }

        for app in &self.appstore.apps {
            if app.name.trim().is_empty() {
                return Err(format!("app store app {} has an empty name", app.id));
            }
        }

        for setting in &self.macos.settings {
            if setting.domain.trim().is_empty() || setting.key.trim().is_empty() {
                return Err("macOS settings need a non-empty domain and key".to_string());
            }
            if let Some(value_type) = setting.value_type {
                check_compatible(&setting.value, value_type)
                    .map_err(|e| format!("setting {}: {e}", setting.identity()))?;
            }
        }

        for app in &self.macos.dock {
            if app.name.trim().is_empty() {
                return Err("dock apps need a name".to_string());
            }
            if app.position == Some(0) {
                return Err(format!("dock app {}: positions start at 1", app.name));
            }
        }

        for setting in &self.git.settings {
            if setting.key.trim().is_empty() {
                return Err("git settings need a non-empty key".to_string());
            }
        }

        for file in &self.files.files {
            if file.source.trim().is_empty() || file.target.trim().is_empty() {
                return Err("managed files need a source and a target".to_string());
            }
        }

        Ok(())
    }

    /// Identities of every declared setting, in declaration order.
    pub fn setting_keys(&self) -> Vec<SettingKey> {
        self.macos.settings.iter().map(Setting::identity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[brew]
packages = ["git", "wget"]
casks = ["iterm2"]

[appstore]
apps = [{ id = 497799835, name = "Xcode" }]

[macos]
wallpaper = "~/Pictures/wall.jpg"
dock = [{ name = "Safari" }, { name = "/System/Applications/Mail.app", position = 2 }]

[[macos.settings]]
domain = "com.apple.dock"
key = "autohide"
value = true

[[macos.settings]]
domain = "com.apple.dock"
key = "tilesize"
value = "48"
type = "int"

[[git.settings]]
scope = "global"
key = "user.name"
value = "Jane Doe"

[[files.files]]
source = "configs/zshrc"
target = "~/.zshrc"
backup = true
"#;

    #[test]
    fn test_parse_full_document() {
        let config = DesiredConfig::from_toml(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.brew.packages, vec!["git", "wget"]);
        assert_eq!(config.appstore.apps[0].id, 497_799_835);
        assert_eq!(config.macos.settings.len(), 2);
        assert_eq!(config.macos.settings[1].value_type, Some(ValueType::Int));
        assert_eq!(config.git.settings[0].scope, GitScope::Global);
        assert!(config.files.files[0].backup);
        assert_eq!(
            config.setting_keys(),
            vec![
                SettingKey::new("com.apple.dock", "autohide"),
                SettingKey::new("com.apple.dock", "tilesize"),
            ]
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = DesiredConfig::from_toml("[brew]\nformulas = [\"git\"]\n").unwrap_err();
        assert!(err.contains("invalid TOML"));
    }

    #[test]
    fn test_numeric_array_setting_parses() {
        let config = DesiredConfig::from_toml(
            r#"
[[macos.settings]]
domain = "com.example.app"
key = "Columns"
value = [1, 2]
"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.macos.settings[0].value,
            Value::StringArray(vec!["1".into(), "2".into()])
        );
    }

    #[test]
    fn test_incompatible_type_tag_fails_validation() {
        let config = DesiredConfig::from_toml(
            r#"
[[macos.settings]]
domain = "com.apple.dock"
key = "tilesize"
value = "large"
type = "int"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_json_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"brew": {{"packages": ["git"]}}}}"#).unwrap();

        let config = DesiredConfig::load(&path).unwrap();
        assert_eq!(config.brew.packages, vec!["git"]);

        let err = DesiredConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_dock_app_identity() {
        let bare = DockApp {
            name: "Safari".into(),
            position: None,
        };
        assert_eq!(bare.label(), "Safari");
        assert_eq!(bare.bundle_path(), "/Applications/Safari.app");

        let path = DockApp {
            name: "/System/Applications/Mail.app".into(),
            position: Some(2),
        };
        assert_eq!(path.label(), "Mail");
        assert_eq!(path.bundle_path(), "/System/Applications/Mail.app");
    }
}
