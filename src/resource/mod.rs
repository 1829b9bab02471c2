//! System collectors and executors
//!
//! Each submodule owns one external tool: it reads observed state for the
//! diff and executes one diff entry at a time. All process invocation goes
//! through a [`CommandRunner`] so everything here runs against a mock in
//! tests.

pub mod appstore;
pub mod brew;
pub mod defaults;
pub mod dock;
pub mod files;
pub mod git;
pub mod wallpaper;

use anyhow::Result;
use declarative::{
    AppDiff, ApplyResult, Collector, CommandOutput, CommandRunner, DockDiff, Executor, FileDiff,
    GitDiff, GitKey, PackageDiff, SettingDiff, SettingKey, Value, WallpaperDiff,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Reads observed state from the local machine
pub struct SystemCollector<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> SystemCollector<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl Collector for SystemCollector<'_> {
    fn packages(&self) -> Result<BTreeMap<String, String>> {
        brew::list(self.runner, brew::Kind::Formula)
    }

    fn casks(&self) -> Result<BTreeMap<String, String>> {
        brew::list(self.runner, brew::Kind::Cask)
    }

    fn apps(&self) -> Result<BTreeMap<u64, String>> {
        appstore::list(self.runner)
    }

    fn settings(&self, domains: &BTreeSet<String>) -> Result<BTreeMap<SettingKey, Value>> {
        defaults::read_domains(self.runner, domains)
    }

    fn git(&self, keys: &[GitKey]) -> Result<BTreeMap<GitKey, String>> {
        Ok(git::read(self.runner, keys))
    }

    fn files(&self, targets: &[PathBuf]) -> Result<BTreeMap<PathBuf, PathBuf>> {
        Ok(files::read_links(targets))
    }

    fn dock_apps(&self) -> Result<Vec<String>> {
        dock::list(self.runner)
    }

    fn wallpaper(&self) -> Result<Option<PathBuf>> {
        wallpaper::current(self.runner)
    }
}

/// Applies diff entries to the local machine
pub struct SystemExecutor<'a> {
    runner: &'a dyn CommandRunner,
    /// Directory managed-file sources are resolved against
    base_dir: PathBuf,
}

impl<'a> SystemExecutor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            base_dir: base_dir.into(),
        }
    }
}

impl Executor for SystemExecutor<'_> {
    fn package(&mut self, entry: &PackageDiff) -> Result<ApplyResult> {
        brew::apply(self.runner, brew::Kind::Formula, entry)
    }

    fn cask(&mut self, entry: &PackageDiff) -> Result<ApplyResult> {
        brew::apply(self.runner, brew::Kind::Cask, entry)
    }

    fn app(&mut self, entry: &AppDiff) -> Result<ApplyResult> {
        appstore::apply(self.runner, entry)
    }

    fn setting(&mut self, entry: &SettingDiff) -> Result<ApplyResult> {
        defaults::apply(self.runner, entry)
    }

    fn dock(&mut self, entry: &DockDiff) -> Result<ApplyResult> {
        dock::apply(self.runner, entry)
    }

    fn wallpaper(&mut self, entry: &WallpaperDiff) -> Result<ApplyResult> {
        wallpaper::apply(self.runner, entry)
    }

    fn git(&mut self, entry: &GitDiff) -> Result<ApplyResult> {
        git::apply(self.runner, entry)
    }

    fn file(&mut self, entry: &FileDiff) -> Result<ApplyResult> {
        files::apply(&self.base_dir, entry)
    }

    fn restart(&mut self, subsystem: &str) -> Result<()> {
        self.runner.run_capture("killall", &[subsystem]).map(|_| ())
    }
}

/// Run one command and turn its exit status into an [`ApplyResult`].
fn run_step(
    runner: &dyn CommandRunner,
    cmd: &str,
    args: &[&str],
    success: String,
    failure: String,
) -> Result<ApplyResult> {
    let output = runner.run(cmd, args)?;
    Ok(if output.is_success() {
        ApplyResult::ok(success)
    } else {
        ApplyResult::failed(failure, failure_reason(&output))
    })
}

/// Best human-readable reason a command failed.
fn failure_reason(output: &CommandOutput) -> String {
    let stderr = output.stderr_str();
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    let stdout = output.stdout_str();
    if !stdout.trim().is_empty() {
        return stdout.trim().to_string();
    }
    match output.code {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockRunner;
    use super::*;
    use declarative::DiffAction;

    #[test]
    fn test_failure_reason_prefers_stderr() {
        assert_eq!(
            failure_reason(&CommandOutput::failure(1, "boom\n")),
            "boom"
        );
        let mut output = CommandOutput::success("only stdout\n");
        output.code = Some(2);
        assert_eq!(failure_reason(&output), "only stdout");
        assert_eq!(
            failure_reason(&CommandOutput::failure(7, "")),
            "exited with status 7"
        );
    }

    #[test]
    fn test_restart_reports_killall_failure() {
        let runner = MockRunner::new().fail("killall Finder", "No matching processes");
        let mut executor = SystemExecutor::new(&runner, "/tmp");
        assert!(executor.restart("Finder").is_err());
        assert!(executor.restart("Dock").is_ok());
        assert_eq!(runner.calls(), vec!["killall Finder", "killall Dock"]);
    }

    #[test]
    fn test_executor_dispatches_by_kind() {
        let runner = MockRunner::new();
        let mut executor = SystemExecutor::new(&runner, "/tmp");
        let entry = PackageDiff {
            action: DiffAction::Add,
            name: "iterm2".into(),
            current_version: None,
        };
        assert!(executor.cask(&entry).unwrap().is_success());
        assert!(executor.package(&entry).unwrap().is_success());
        assert_eq!(
            runner.calls(),
            vec!["brew install --cask iterm2", "brew install iterm2"]
        );
    }
}
