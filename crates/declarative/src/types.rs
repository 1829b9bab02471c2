//! Core types: observed state, diff entries and apply results

use crate::desired::{GitKey, GitScope, SettingKey};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Output;

// ============================================================================
// Observed State
// ============================================================================

/// Freshly collected state of the workstation, one mapping per resource kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedState {
    /// Formula name -> installed version
    pub packages: BTreeMap<String, String>,
    /// Cask name -> installed version
    pub casks: BTreeMap<String, String>,
    /// App Store id -> display name
    pub apps: BTreeMap<u64, String>,
    /// `domain:key` -> current value
    pub settings: BTreeMap<SettingKey, Value>,
    /// Persistent Dock apps, in Dock order
    pub dock: Vec<String>,
    /// `scope.key` -> current value (possibly empty)
    pub git: BTreeMap<GitKey, String>,
    /// Expanded symlink target -> resolved link source
    pub files: BTreeMap<PathBuf, PathBuf>,
    /// Current desktop picture
    pub wallpaper: Option<PathBuf>,
}

// ============================================================================
// Diff
// ============================================================================

/// What the orchestrator must do for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    Add,
    Update,
    Remove,
    None,
}

impl DiffAction {
    pub fn is_change(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Diff-line symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Update => "~",
            Self::Remove => "-",
            Self::None => " ",
        }
    }
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::None => "none",
        })
    }
}

/// Formula or cask entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDiff {
    pub action: DiffAction,
    pub name: String,
    pub current_version: Option<String>,
}

/// App Store app entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDiff {
    pub action: DiffAction,
    pub id: u64,
    pub name: String,
}

/// Preference key entry
#[derive(Debug, Clone, PartialEq)]
pub struct SettingDiff {
    pub action: DiffAction,
    pub domain: String,
    pub key: String,
    pub current: Option<Value>,
    pub desired: Option<Value>,
    /// Wire type for writes (explicit or inferred); absent on removals
    pub value_type: Option<ValueType>,
}

impl SettingDiff {
    pub fn identity(&self) -> SettingKey {
        SettingKey::new(&self.domain, &self.key)
    }
}

/// Git config entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitDiff {
    pub action: DiffAction,
    pub scope: GitScope,
    pub key: String,
    pub current: Option<String>,
    pub desired: Option<String>,
}

/// Managed file entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub action: DiffAction,
    /// Source as declared
    pub source: String,
    /// Target as declared
    pub target: String,
    /// Expanded target path (identity)
    pub target_path: PathBuf,
    /// What the existing symlink resolves to
    pub current_target: Option<PathBuf>,
    /// Where the symlink should point once generated
    pub expected_target: PathBuf,
    pub backup: bool,
}

impl FileDiff {
    /// Whether the existing link already points into the generated directory.
    pub fn link_is_current(&self) -> bool {
        self.current_target.as_deref() == Some(self.expected_target.as_path())
    }
}

/// Desktop picture change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperDiff {
    pub from: Option<PathBuf>,
    pub to: PathBuf,
}

/// Dock app entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockDiff {
    pub action: DiffAction,
    /// Dock label (identity)
    pub name: String,
    /// Bundle path for additions
    pub path: Option<String>,
    pub position: Option<usize>,
}

/// Typed difference between desired and observed state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub packages: Vec<PackageDiff>,
    pub casks: Vec<PackageDiff>,
    pub apps: Vec<AppDiff>,
    pub settings: Vec<SettingDiff>,
    /// Empty unless the config declares Dock apps
    pub dock: Vec<DockDiff>,
    pub git: Vec<GitDiff>,
    pub files: Vec<FileDiff>,
    pub wallpaper: Option<WallpaperDiff>,
}

/// Counts of pending changes by action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub updates: usize,
    pub removals: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    fn count(&mut self, action: DiffAction) {
        match action {
            DiffAction::Add => self.additions += 1,
            DiffAction::Update => self.updates += 1,
            DiffAction::Remove => self.removals += 1,
            DiffAction::None => self.unchanged += 1,
        }
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.updates + self.removals
    }
}

impl Diff {
    /// Every action in the diff, kind by kind.
    pub fn actions(&self) -> impl Iterator<Item = DiffAction> + '_ {
        self.packages
            .iter()
            .map(|d| d.action)
            .chain(self.casks.iter().map(|d| d.action))
            .chain(self.apps.iter().map(|d| d.action))
            .chain(self.settings.iter().map(|d| d.action))
            .chain(self.dock.iter().map(|d| d.action))
            .chain(self.git.iter().map(|d| d.action))
            .chain(self.files.iter().map(|d| d.action))
            .chain(self.wallpaper.iter().map(|w| {
                if w.from.is_some() {
                    DiffAction::Update
                } else {
                    DiffAction::Add
                }
            }))
    }

    /// Check if anything would change
    pub fn has_changes(&self) -> bool {
        self.actions().any(DiffAction::is_change)
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for action in self.actions() {
            summary.count(action);
        }
        summary
    }
}

// ============================================================================
// Apply Results
// ============================================================================

/// Outcome of one executed entry (or sub-step)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

impl ApplyResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Success/failure tally of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    pub fn from_results(results: &[ApplyResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.add_result(result);
        }
        summary
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Ordered result log plus final counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub results: Vec<ApplyResult>,
    pub summary: ExecuteSummary,
}

// ============================================================================
// Command Output
// ============================================================================

/// Output from an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(action: DiffAction, name: &str) -> PackageDiff {
        PackageDiff {
            action,
            name: name.into(),
            current_version: None,
        }
    }

    #[test]
    fn test_has_changes() {
        let mut diff = Diff::default();
        assert!(!diff.has_changes());

        diff.packages.push(package(DiffAction::None, "git"));
        assert!(!diff.has_changes());

        diff.wallpaper = Some(WallpaperDiff {
            from: None,
            to: "/Library/Desktop Pictures/Sonoma.heic".into(),
        });
        assert!(diff.has_changes());
    }

    #[test]
    fn test_summary_counts() {
        let diff = Diff {
            packages: vec![
                package(DiffAction::Add, "wget"),
                package(DiffAction::None, "git"),
                package(DiffAction::Remove, "htop"),
            ],
            casks: vec![package(DiffAction::Update, "iterm2")],
            ..Default::default()
        };

        let summary = diff.summary();
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.updates, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_execute_summary() {
        let results = vec![
            ApplyResult::ok("Installed package: wget"),
            ApplyResult::failed("Failed to install package: nope", "No available formula"),
            ApplyResult::ok("Installed cask: iterm2"),
        ];
        let summary = ExecuteSummary::from_results(&results);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_command_output() {
        let ok = CommandOutput::success("git 2.40\n");
        assert!(ok.is_success());
        assert_eq!(ok.stdout_str(), "git 2.40\n");

        let failed = CommandOutput::failure(1, "boom");
        assert!(!failed.is_success());
        assert_eq!(failed.stderr_str(), "boom");
    }
}
