//! Apply orchestrator - executes a diff in fixed domain order
//!
//! Order: packages, casks, App Store apps, settings, (restarts), Dock,
//! wallpaper, git, files. Entries with no action are skipped. A failing
//! entry is recorded and the walk continues.

use crate::context::{Executor, ProgressCallback};
use crate::restart::RestartCoalescer;
use crate::types::{
    AppDiff, ApplyReport, ApplyResult, Diff, DiffAction, DockDiff, ExecuteSummary, FileDiff,
    GitDiff, PackageDiff, SettingDiff,
};
use anyhow::Result;

/// Dock process, restarted once after any Dock change
pub const DOCK_SUBSYSTEM: &str = "Dock";

/// Walks a [`Diff`] and drives an [`Executor`].
///
/// Owns the restart coalescer; it is reset at the start of every run.
#[derive(Debug, Default)]
pub struct Orchestrator {
    restarts: RestartCoalescer,
}

/// Per-run execution state
struct Run<'a, E, P> {
    executor: &'a mut E,
    progress: &'a mut P,
    results: Vec<ApplyResult>,
}

impl<E: Executor, P: ProgressCallback> Run<'_, E, P> {
    /// Execute one entry, converting `Err` into a failed result.
    fn execute<F>(&mut self, description: String, f: F) -> bool
    where
        F: FnOnce(&mut E) -> Result<ApplyResult>,
    {
        log::debug!("Applying: {description}");
        let result = match f(&mut *self.executor) {
            Ok(result) => result,
            Err(e) => ApplyResult::failed(description, format!("{e:#}")),
        };
        if let Some(error) = &result.error {
            log::warn!("{}: {error}", result.message);
        }
        let success = result.success;
        self.progress.on_result(&result);
        self.results.push(result);
        success
    }

    fn start(&mut self, domain: &str, count: usize) -> bool {
        if count == 0 {
            return false;
        }
        self.progress.on_domain_start(domain, count);
        true
    }
}

fn pending<T>(entries: &[T], action: impl Fn(&T) -> DiffAction) -> Vec<&T> {
    entries.iter().filter(|e| action(*e).is_change()).collect()
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute every non-`none` entry of `diff`.
    pub fn apply<E, P>(&mut self, diff: &Diff, executor: &mut E, progress: &mut P) -> ApplyReport
    where
        E: Executor,
        P: ProgressCallback,
    {
        self.restarts.clear();
        let mut run = Run {
            executor,
            progress,
            results: Vec::new(),
        };

        let packages = pending(&diff.packages, |d| d.action);
        if run.start("packages", packages.len()) {
            for entry in packages {
                run.execute(describe_package("package", entry), |e| e.package(entry));
            }
        }

        let casks = pending(&diff.casks, |d| d.action);
        if run.start("casks", casks.len()) {
            for entry in casks {
                run.execute(describe_package("cask", entry), |e| e.cask(entry));
            }
        }

        let apps = pending(&diff.apps, |d| d.action);
        if run.start("apps", apps.len()) {
            for entry in apps {
                run.execute(describe_app(entry), |e| e.app(entry));
            }
        }

        let settings = pending(&diff.settings, |d| d.action);
        if run.start("settings", settings.len()) {
            for entry in settings {
                if run.execute(describe_setting(entry), |e| e.setting(entry)) {
                    self.restarts.note(&entry.domain);
                }
            }
        }

        let Run {
            executor, progress, ..
        } = &mut run;
        self.restarts.flush(|subsystem| {
            progress.on_restart(subsystem);
            executor.restart(subsystem)
        });

        self.apply_dock(&diff.dock, &mut run);

        if let Some(wallpaper) = &diff.wallpaper
            && run.start("wallpaper", 1)
        {
            let description = format!("Set wallpaper: {}", wallpaper.to.display());
            run.execute(description, |e| e.wallpaper(wallpaper));
        }

        let git = pending(&diff.git, |d| d.action);
        if run.start("git", git.len()) {
            for entry in git {
                run.execute(describe_git(entry), |e| e.git(entry));
            }
        }

        let files = pending(&diff.files, |d| d.action);
        if run.start("files", files.len()) {
            for entry in files {
                run.execute(describe_file(entry), |e| e.file(entry));
            }
        }

        let summary = ExecuteSummary::from_results(&run.results);
        log::info!(
            "Apply finished: {} succeeded, {} failed",
            summary.succeeded,
            summary.failed
        );
        ApplyReport {
            results: run.results,
            summary,
        }
    }

    /// Dock entries (removals first, then additions), followed by one
    /// Dock restart.
    fn apply_dock<E, P>(&mut self, dock: &[DockDiff], run: &mut Run<'_, E, P>)
    where
        E: Executor,
        P: ProgressCallback,
    {
        let changes = pending(dock, |d| d.action);
        if !run.start("dock", changes.len()) {
            return;
        }

        for entry in changes {
            run.execute(describe_dock(entry), |e| e.dock(entry));
        }

        self.restarts.note_subsystem(DOCK_SUBSYSTEM);
        let Run {
            executor, progress, ..
        } = run;
        self.restarts.flush(|subsystem| {
            progress.on_restart(subsystem);
            executor.restart(subsystem)
        });
    }
}

fn describe_package(kind: &str, entry: &PackageDiff) -> String {
    let verb = match entry.action {
        DiffAction::Add => "Install",
        DiffAction::Update => "Upgrade",
        DiffAction::Remove => "Uninstall",
        DiffAction::None => "Keep",
    };
    format!("{verb} {kind}: {}", entry.name)
}

fn describe_app(entry: &AppDiff) -> String {
    let verb = match entry.action {
        DiffAction::Remove => "Remove",
        DiffAction::Update => "Update",
        _ => "Install",
    };
    format!("{verb} app: {} ({})", entry.name, entry.id)
}

fn describe_setting(entry: &SettingDiff) -> String {
    match (&entry.action, &entry.desired) {
        (DiffAction::Remove, _) | (_, None) => format!("Delete setting: {}", entry.identity()),
        (_, Some(value)) => format!("Set {} = {value}", entry.identity()),
    }
}

fn describe_dock(entry: &DockDiff) -> String {
    match entry.action {
        DiffAction::Remove => format!("Remove from Dock: {}", entry.name),
        _ => format!("Add to Dock: {}", entry.name),
    }
}

fn describe_git(entry: &GitDiff) -> String {
    format!(
        "Set git {} {} = {}",
        entry.scope,
        entry.key,
        entry.desired.as_deref().unwrap_or_default()
    )
}

fn describe_file(entry: &FileDiff) -> String {
    format!("Link {} -> {}", entry.target, entry.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::desired::{DesiredConfig, DockApp, GitKey, Setting, SettingKey};
    use crate::diff::{DiffContext, compute_diff};
    use crate::record::PersistedRecord;
    use crate::types::{ObservedState, WallpaperDiff};
    use crate::value::Value;
    use std::collections::HashSet;

    /// In-memory machine: executing an entry mutates the observed state.
    #[derive(Default)]
    struct SimulatedMachine {
        observed: ObservedState,
        fail: HashSet<String>,
        calls: Vec<String>,
        restarts: Vec<String>,
    }

    impl SimulatedMachine {
        fn outcome(&mut self, id: &str) -> Result<ApplyResult> {
            self.calls.push(id.to_string());
            if self.fail.contains(id) {
                anyhow::bail!("simulated failure for {id}");
            }
            Ok(ApplyResult::ok(id))
        }
    }

    impl Executor for SimulatedMachine {
        fn package(&mut self, entry: &PackageDiff) -> Result<ApplyResult> {
            let result = self.outcome(&entry.name)?;
            match entry.action {
                DiffAction::Remove => {
                    self.observed.packages.remove(&entry.name);
                }
                _ => {
                    self.observed.packages.insert(entry.name.clone(), "1.0".into());
                }
            }
            Ok(result)
        }

        fn cask(&mut self, entry: &PackageDiff) -> Result<ApplyResult> {
            let result = self.outcome(&entry.name)?;
            match entry.action {
                DiffAction::Remove => {
                    self.observed.casks.remove(&entry.name);
                }
                _ => {
                    self.observed.casks.insert(entry.name.clone(), "1.0".into());
                }
            }
            Ok(result)
        }

        fn app(&mut self, entry: &AppDiff) -> Result<ApplyResult> {
            let result = self.outcome(&entry.name)?;
            self.observed.apps.insert(entry.id, entry.name.clone());
            Ok(result)
        }

        fn setting(&mut self, entry: &SettingDiff) -> Result<ApplyResult> {
            let result = self.outcome(&entry.identity().to_string())?;
            match &entry.desired {
                Some(value) if entry.action != DiffAction::Remove => {
                    self.observed.settings.insert(entry.identity(), value.clone());
                }
                _ => {
                    self.observed.settings.remove(&entry.identity());
                }
            }
            Ok(result)
        }

        fn dock(&mut self, entry: &DockDiff) -> Result<ApplyResult> {
            let result = self.outcome(&format!("dock:{}", entry.name))?;
            match entry.action {
                DiffAction::Remove => self.observed.dock.retain(|name| *name != entry.name),
                _ => self.observed.dock.push(entry.name.clone()),
            }
            Ok(result)
        }

        fn wallpaper(&mut self, entry: &WallpaperDiff) -> Result<ApplyResult> {
            let result = self.outcome("wallpaper")?;
            self.observed.wallpaper = Some(entry.to.clone());
            Ok(result)
        }

        fn git(&mut self, entry: &GitDiff) -> Result<ApplyResult> {
            let result = self.outcome(&entry.key)?;
            let key = GitKey {
                scope: entry.scope,
                key: entry.key.clone(),
            };
            self.observed
                .git
                .insert(key, entry.desired.clone().unwrap_or_default());
            Ok(result)
        }

        fn file(&mut self, entry: &FileDiff) -> Result<ApplyResult> {
            let result = self.outcome(&entry.target)?;
            self.observed
                .files
                .insert(entry.target_path.clone(), entry.expected_target.clone());
            Ok(result)
        }

        fn restart(&mut self, subsystem: &str) -> Result<()> {
            self.restarts.push(subsystem.to_string());
            Ok(())
        }
    }

    fn ctx() -> DiffContext {
        DiffContext::new("/Users/jane", "/Users/jane/.config/mactide")
    }

    fn setting(domain: &str, key: &str, value: Value) -> Setting {
        Setting {
            domain: domain.into(),
            key: key.into(),
            value,
            value_type: None,
        }
    }

    #[test]
    fn test_partial_failure_continues() {
        let mut desired = DesiredConfig::default();
        desired.brew.packages = ["a", "b", "c", "d", "e"].map(String::from).to_vec();

        let mut machine = SimulatedMachine::default();
        machine.fail.insert("c".into());

        let diff = compute_diff(
            &desired,
            &ObservedState::default(),
            &PersistedRecord::default(),
            &ctx(),
        );
        let report = Orchestrator::new().apply(&diff, &mut machine, &mut NoProgress);

        assert_eq!(machine.calls, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(report.results.len(), 5);
        assert!(!report.results[2].success);
        assert_eq!(report.results[2].message, "Install package: c");
        assert!(
            report.results[2]
                .error
                .as_deref()
                .unwrap()
                .contains("simulated failure")
        );
        assert_eq!(report.summary.succeeded, 4);
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn test_none_entries_are_skipped() {
        let mut desired = DesiredConfig::default();
        desired.brew.packages = vec!["git".into()];
        let mut machine = SimulatedMachine::default();
        machine.observed.packages.insert("git".into(), "2.40".into());

        let diff = compute_diff(
            &desired,
            &machine.observed,
            &PersistedRecord::default(),
            &ctx(),
        );
        let report = Orchestrator::new().apply(&diff, &mut machine, &mut NoProgress);

        assert!(machine.calls.is_empty());
        assert!(report.results.is_empty());
        assert!(report.summary.is_success());
    }

    #[test]
    fn test_restarts_coalesced_after_settings() {
        let mut desired = DesiredConfig::default();
        desired.macos.settings = vec![
            setting("com.apple.dock", "autohide", Value::Bool(true)),
            setting("com.apple.dock", "tilesize", Value::Int(48)),
            setting("NSGlobalDomain", "AppleShowAllExtensions", Value::Bool(true)),
            setting("com.apple.screencapture", "type", Value::from("png")),
            setting("com.example.app", "x", Value::Int(1)),
        ];
        let mut machine = SimulatedMachine::default();
        machine.fail.insert("com.apple.screencapture:type".into());

        let diff = compute_diff(
            &desired,
            &ObservedState::default(),
            &PersistedRecord::default(),
            &ctx(),
        );
        let mut orchestrator = Orchestrator::new();
        let report = orchestrator.apply(&diff, &mut machine, &mut NoProgress);

        assert_eq!(report.summary.failed, 1);
        assert_eq!(machine.restarts, vec!["Dock", "SystemUIServer"]);
    }

    #[test]
    fn test_failed_setting_write_does_not_restart() {
        let mut desired = DesiredConfig::default();
        desired.macos.settings = vec![setting(
            "com.apple.finder",
            "ShowPathbar",
            Value::Bool(true),
        )];
        let mut machine = SimulatedMachine::default();
        machine.fail.insert("com.apple.finder:ShowPathbar".into());

        let diff = compute_diff(
            &desired,
            &ObservedState::default(),
            &PersistedRecord::default(),
            &ctx(),
        );
        Orchestrator::new().apply(&diff, &mut machine, &mut NoProgress);
        assert!(machine.restarts.is_empty());
    }

    fn dock_diff(desired: &DesiredConfig, machine: &SimulatedMachine) -> Diff {
        compute_diff(
            desired,
            &machine.observed,
            &PersistedRecord::default(),
            &ctx(),
        )
    }

    #[test]
    fn test_dock_removes_before_adds_and_restarts_once() {
        let mut desired = DesiredConfig::default();
        desired.macos.dock = vec![
            DockApp {
                name: "Safari".into(),
                position: None,
            },
            DockApp {
                name: "Terminal".into(),
                position: Some(1),
            },
        ];
        let mut machine = SimulatedMachine::default();
        machine.observed.dock = vec!["Safari".into(), "Music".into(), "News".into()];

        let diff = dock_diff(&desired, &machine);
        let report = Orchestrator::new().apply(&diff, &mut machine, &mut NoProgress);

        assert_eq!(
            machine.calls,
            vec!["dock:Music", "dock:News", "dock:Terminal"]
        );
        assert_eq!(machine.observed.dock, vec!["Safari", "Terminal"]);
        assert_eq!(machine.restarts, vec!["Dock"]);
        assert_eq!(report.summary.succeeded, 3);
        assert!(!dock_diff(&desired, &machine).has_changes());
    }

    #[test]
    fn test_dock_untouched_when_matching() {
        let mut desired = DesiredConfig::default();
        desired.macos.dock = vec![DockApp {
            name: "Safari".into(),
            position: None,
        }];
        let mut machine = SimulatedMachine::default();
        machine.observed.dock = vec!["Safari".into()];

        let diff = dock_diff(&desired, &machine);
        let report = Orchestrator::new().apply(&diff, &mut machine, &mut NoProgress);
        assert!(report.results.is_empty());
        assert!(machine.restarts.is_empty());
    }

    #[test]
    fn test_domain_order() {
        let desired = DesiredConfig::from_toml(
            r#"
[brew]
packages = ["wget"]
casks = ["iterm2"]

[appstore]
apps = [{ id = 1, name = "Things" }]

[macos]
wallpaper = "/tmp/wall.jpg"

[[macos.settings]]
domain = "com.example.app"
key = "x"
value = 1

[[git.settings]]
scope = "global"
key = "user.name"
value = "Jane"

[[files.files]]
source = "zshrc"
target = "~/.zshrc"
"#,
        )
        .unwrap();
        let mut machine = SimulatedMachine::default();
        let diff = compute_diff(
            &desired,
            &ObservedState::default(),
            &PersistedRecord::default(),
            &ctx(),
        );
        Orchestrator::new().apply(&diff, &mut machine, &mut NoProgress);

        assert_eq!(
            machine.calls,
            vec![
                "wget",
                "iterm2",
                "Things",
                "com.example.app:x",
                "wallpaper",
                "user.name",
                "~/.zshrc",
            ]
        );
    }

    #[test]
    fn test_apply_converges() {
        let desired = DesiredConfig::from_toml(
            r#"
[brew]
packages = ["git", "wget"]
casks = ["iterm2"]

[appstore]
apps = [{ id = 497799835, name = "Xcode" }]

[macos]
wallpaper = "~/Pictures/wall.jpg"

[[macos.settings]]
domain = "com.apple.dock"
key = "tilesize"
value = 48

[[macos.settings]]
domain = "com.apple.finder"
key = "ShowPathbar"
value = true

[[git.settings]]
scope = "global"
key = "user.name"
value = "Jane Doe"
"#,
        )
        .unwrap();

        let mut machine = SimulatedMachine::default();
        machine.observed.packages.insert("htop".into(), "1.0".into());
        machine
            .observed
            .settings
            .insert(SettingKey::new("com.apple.dock", "tilesize"), Value::from("36"));
        machine
            .observed
            .settings
            .insert(SettingKey::new("com.apple.dock", "autohide"), Value::Bool(true));

        let record = PersistedRecord::new(vec![SettingKey::new("com.apple.dock", "autohide")]);
        let ctx = ctx().strict(true);

        let diff = compute_diff(&desired, &machine.observed, &record, &ctx);
        assert!(diff.has_changes());
        let report = Orchestrator::new().apply(&diff, &mut machine, &mut NoProgress);
        assert!(report.summary.is_success());

        let record = PersistedRecord::from_desired(&desired);
        let diff = compute_diff(&desired, &machine.observed, &record, &ctx);
        assert!(!diff.has_changes(), "{diff:?}");
        assert!(!machine.observed.packages.contains_key("htop"));
        assert!(
            !machine
                .observed
                .settings
                .contains_key(&SettingKey::new("com.apple.dock", "autohide"))
        );
    }
}
