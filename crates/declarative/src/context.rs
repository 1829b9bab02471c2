//! Collaborator traits
//!
//! These traits let the engine run without depending on how commands are
//! spawned, how state is observed, or how progress is shown. The binary
//! provides system implementations; tests provide in-memory ones.

use crate::desired::{DesiredConfig, GitKey, GitSetting, SettingKey};
use crate::diff::DiffContext;
use crate::record::PersistedRecord;
use crate::types::{
    AppDiff, ApplyResult, CommandOutput, Diff, DockDiff, FileDiff, GitDiff, ObservedState,
    PackageDiff, SettingDiff, WallpaperDiff,
};
use crate::value::Value;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Narrow interface over external process invocation
///
/// Implement this trait to run commands; mock it to test without an OS.
pub trait CommandRunner {
    /// Run a command to completion
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command and return just success/failure
    fn run_status(&self, cmd: &str, args: &[&str]) -> Result<bool> {
        Ok(self.run(cmd, args)?.is_success())
    }

    /// Run a command and capture stdout, failing on a non-zero exit
    fn run_capture(&self, cmd: &str, args: &[&str]) -> Result<String> {
        let output = self.run(cmd, args)?;
        if !output.is_success() {
            return Err(crate::Error::CommandFailed {
                command: render_command(cmd, args),
                code: output.code,
                stderr: output.stderr_str().trim().to_string(),
            }
            .into());
        }
        Ok(output.stdout_str())
    }
}

/// Render a command line for messages and logs.
pub fn render_command(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Observed-state source, one method per resource kind
///
/// Errors are fine here: [`collect_observed`] degrades a failing kind to
/// an empty mapping.
pub trait Collector {
    /// Installed formulae with versions
    fn packages(&self) -> Result<BTreeMap<String, String>>;

    /// Installed casks with versions
    fn casks(&self) -> Result<BTreeMap<String, String>>;

    /// Installed App Store apps by id
    fn apps(&self) -> Result<BTreeMap<u64, String>>;

    /// Current values for every key in the given preference domains
    fn settings(&self, domains: &BTreeSet<String>) -> Result<BTreeMap<SettingKey, Value>>;

    /// Current values of the given git keys (absent keys omitted)
    fn git(&self, keys: &[GitKey]) -> Result<BTreeMap<GitKey, String>>;

    /// Resolved link source for every target that is a symlink
    fn files(&self, targets: &[PathBuf]) -> Result<BTreeMap<PathBuf, PathBuf>>;

    /// Persistent Dock apps, in Dock order
    fn dock_apps(&self) -> Result<Vec<String>>;

    /// Current desktop picture
    fn wallpaper(&self) -> Result<Option<PathBuf>>;
}

/// Per-kind change executor
///
/// An `Err` is turned into a failed [`ApplyResult`] by the orchestrator, so
/// implementations may use `?` freely.
pub trait Executor {
    fn package(&mut self, entry: &PackageDiff) -> Result<ApplyResult>;

    fn cask(&mut self, entry: &PackageDiff) -> Result<ApplyResult>;

    fn app(&mut self, entry: &AppDiff) -> Result<ApplyResult>;

    fn setting(&mut self, entry: &SettingDiff) -> Result<ApplyResult>;

    fn dock(&mut self, entry: &DockDiff) -> Result<ApplyResult>;

    fn wallpaper(&mut self, entry: &WallpaperDiff) -> Result<ApplyResult>;

    fn git(&mut self, entry: &GitDiff) -> Result<ApplyResult>;

    fn file(&mut self, entry: &FileDiff) -> Result<ApplyResult>;

    /// Restart a subsystem (best-effort)
    fn restart(&mut self, subsystem: &str) -> Result<()>;
}

/// Progress callback for apply operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once the diff is known, before confirmation
    fn on_diff(&mut self, _diff: &Diff) {}

    /// Called when starting a resource kind with pending entries
    fn on_domain_start(&mut self, domain: &str, count: usize);

    /// Called after every executed entry
    fn on_result(&mut self, result: &ApplyResult);

    /// Called when a subsystem restart is issued
    fn on_restart(&mut self, _subsystem: &str) {}
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_domain_start(&mut self, _domain: &str, _count: usize) {}
    fn on_result(&mut self, _result: &ApplyResult) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Collect observed state for everything `desired` and `record` mention.
///
/// A failing collector is logged and its kind treated as empty, so every
/// desired item of that kind diffs as an addition.
pub fn collect_observed(
    collector: &dyn Collector,
    desired: &DesiredConfig,
    record: &PersistedRecord,
    ctx: &DiffContext,
) -> ObservedState {
    let domains: BTreeSet<String> = desired
        .macos
        .settings
        .iter()
        .map(|s| s.domain.clone())
        .chain(record.settings.iter().map(|k| k.domain.clone()))
        .collect();
    let git_keys: Vec<GitKey> = desired.git.settings.iter().map(GitSetting::identity).collect();
    let targets: Vec<PathBuf> = desired
        .files
        .files
        .iter()
        .map(|f| ctx.expand(&f.target))
        .collect();

    ObservedState {
        packages: or_empty("brew", collector.packages()),
        casks: or_empty("cask", collector.casks()),
        apps: or_empty("appstore", collector.apps()),
        settings: if domains.is_empty() {
            BTreeMap::new()
        } else {
            or_empty("macos", collector.settings(&domains))
        },
        git: if git_keys.is_empty() {
            BTreeMap::new()
        } else {
            or_empty("git", collector.git(&git_keys))
        },
        files: if targets.is_empty() {
            BTreeMap::new()
        } else {
            or_empty("files", collector.files(&targets))
        },
        dock: if desired.macos.dock.is_empty() {
            Vec::new()
        } else {
            or_empty("dock", collector.dock_apps())
        },
        wallpaper: if desired.macos.wallpaper.is_some() {
            or_empty("wallpaper", collector.wallpaper())
        } else {
            None
        },
    }
}

fn or_empty<T: Default>(domain: &'static str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        let err = crate::Error::Collection {
            domain,
            message: format!("{e:#}"),
        };
        log::warn!("{err}; treating as empty");
        T::default()
    })
}
