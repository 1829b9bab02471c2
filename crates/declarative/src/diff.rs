//! Diff engine - desired vs observed, one sub-algorithm per resource kind
//!
//! Everything here is pure: no I/O, no logging, no clock. Home and base
//! directories needed for path expansion come in through [`DiffContext`].

use crate::desired::{DesiredConfig, DockApp, GitSetting, ManagedFile, Setting, SettingKey};
use crate::record::PersistedRecord;
use crate::types::{
    AppDiff, Diff, DiffAction, DockDiff, FileDiff, GitDiff, ObservedState, PackageDiff,
    SettingDiff, WallpaperDiff,
};
use crate::value::{Value, coerce, infer_type, values_equal};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Inputs to the diff besides the three states
#[derive(Debug, Clone, Default)]
pub struct DiffContext {
    /// Propose removal of unmanaged packages, casks and apps
    pub strict: bool,
    /// Home directory used to expand `~/`
    pub home: PathBuf,
    /// Directory relative paths are resolved against (the config directory)
    pub base_dir: PathBuf,
    /// Directory holding generated managed-file contents
    pub generated_dir: PathBuf,
}

impl DiffContext {
    pub fn new(home: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            strict: false,
            home: home.into(),
            generated_dir: base_dir.join(".generated"),
            base_dir,
        }
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Expand a user-entered path: `~` against home, relative against base.
    pub fn expand(&self, path: &str) -> PathBuf {
        expand_with(&self.home, &self.base_dir, path)
    }
}

/// Expand `~`/`~/..` against `home` and relative paths against `base`.
pub fn expand_with(home: &Path, base: &Path, path: &str) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home.join(rest);
    }
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Compute the full diff.
pub fn compute_diff(
    desired: &DesiredConfig,
    observed: &ObservedState,
    record: &PersistedRecord,
    ctx: &DiffContext,
) -> Diff {
    Diff {
        packages: diff_packages(&desired.brew.packages, &observed.packages, ctx.strict),
        casks: diff_packages(&desired.brew.casks, &observed.casks, ctx.strict),
        apps: diff_apps(desired, &observed.apps, ctx.strict),
        settings: diff_settings(&desired.macos.settings, &observed.settings, record),
        dock: if desired.macos.dock.is_empty() {
            Vec::new()
        } else {
            diff_dock(&desired.macos.dock, &observed.dock)
        },
        git: diff_git(&desired.git.settings, observed),
        files: diff_files(&desired.files.files, &observed.files, ctx),
        wallpaper: diff_wallpaper(desired.macos.wallpaper.as_deref(), observed, ctx),
    }
}

/// Formulae and casks: presence only, strict mode appends removals.
pub fn diff_packages(
    desired: &[String],
    observed: &BTreeMap<String, String>,
    strict: bool,
) -> Vec<PackageDiff> {
    let mut diffs: Vec<PackageDiff> = desired
        .iter()
        .map(|name| match observed.get(name) {
            Some(version) => PackageDiff {
                action: DiffAction::None,
                name: name.clone(),
                current_version: Some(version.clone()),
            },
            None => PackageDiff {
                action: DiffAction::Add,
                name: name.clone(),
                current_version: None,
            },
        })
        .collect();

    if strict {
        let wanted: HashSet<&str> = desired.iter().map(String::as_str).collect();
        diffs.extend(
            observed
                .iter()
                .filter(|(name, _)| !wanted.contains(name.as_str()))
                .map(|(name, version)| PackageDiff {
                    action: DiffAction::Remove,
                    name: name.clone(),
                    current_version: Some(version.clone()),
                }),
        );
    }

    diffs
}

fn diff_apps(
    desired: &DesiredConfig,
    observed: &BTreeMap<u64, String>,
    strict: bool,
) -> Vec<AppDiff> {
    let apps = &desired.appstore.apps;
    let mut diffs: Vec<AppDiff> = apps
        .iter()
        .map(|app| AppDiff {
            action: if observed.contains_key(&app.id) {
                DiffAction::None
            } else {
                DiffAction::Add
            },
            id: app.id,
            name: app.name.clone(),
        })
        .collect();

    if strict {
        let wanted: HashSet<u64> = apps.iter().map(|app| app.id).collect();
        diffs.extend(
            observed
                .iter()
                .filter(|(id, _)| !wanted.contains(id))
                .map(|(id, name)| AppDiff {
                    action: DiffAction::Remove,
                    id: *id,
                    name: name.clone(),
                }),
        );
    }

    diffs
}

/// Settings: removals come from the persisted record, never from observed
/// keys, and ignore the strict flag. A tagged value is compared in the form
/// the tag makes it take once written.
fn diff_settings(
    desired: &[Setting],
    observed: &BTreeMap<SettingKey, Value>,
    record: &PersistedRecord,
) -> Vec<SettingDiff> {
    let mut diffs: Vec<SettingDiff> = desired
        .iter()
        .map(|setting| {
            let value_type = setting
                .value_type
                .unwrap_or_else(|| infer_type(&setting.value));
            let desired = match setting.value_type {
                Some(tag) => coerce(&setting.value, tag).unwrap_or_else(|_| setting.value.clone()),
                None => setting.value.clone(),
            };
            let current = observed.get(&setting.identity()).cloned();
            let action = match &current {
                None => DiffAction::Add,
                Some(current) if values_equal(current, &desired) => DiffAction::None,
                Some(_) => DiffAction::Update,
            };
            SettingDiff {
                action,
                domain: setting.domain.clone(),
                key: setting.key.clone(),
                current,
                desired: Some(desired),
                value_type: Some(value_type),
            }
        })
        .collect();

    let wanted: HashSet<SettingKey> = desired.iter().map(Setting::identity).collect();
    let mut seen = HashSet::new();
    for key in &record.settings {
        if wanted.contains(key) || !seen.insert(key) {
            continue;
        }
        if let Some(current) = observed.get(key) {
            diffs.push(SettingDiff {
                action: DiffAction::Remove,
                domain: key.domain.clone(),
                key: key.key.clone(),
                current: Some(current.clone()),
                desired: None,
                value_type: None,
            });
        }
    }

    diffs
}

/// Git: an empty observed value counts as unset.
fn diff_git(desired: &[GitSetting], observed: &ObservedState) -> Vec<GitDiff> {
    desired
        .iter()
        .map(|setting| {
            let current = observed
                .git
                .get(&setting.identity())
                .filter(|value| !value.is_empty())
                .cloned();
            let action = match &current {
                None => DiffAction::Add,
                Some(current) if *current == setting.value => DiffAction::None,
                Some(_) => DiffAction::Update,
            };
            GitDiff {
                action,
                scope: setting.scope,
                key: setting.key.clone(),
                current,
                desired: Some(setting.value.clone()),
            }
        })
        .collect()
}

/// Managed files: contents are regenerated every run, so an existing link
/// is always an update.
fn diff_files(
    desired: &[ManagedFile],
    observed: &BTreeMap<PathBuf, PathBuf>,
    ctx: &DiffContext,
) -> Vec<FileDiff> {
    desired
        .iter()
        .map(|file| {
            let target_path = ctx.expand(&file.target);
            let expected_target = generated_path(&ctx.generated_dir, &target_path);
            let current_target = observed.get(&target_path).cloned();
            FileDiff {
                action: if current_target.is_some() {
                    DiffAction::Update
                } else {
                    DiffAction::Add
                },
                source: file.source.clone(),
                target: file.target.clone(),
                target_path,
                current_target,
                expected_target,
                backup: file.backup,
            }
        })
        .collect()
}

/// Location of a managed file's generated contents.
pub fn generated_path(generated_dir: &Path, target: &Path) -> PathBuf {
    match target.file_name() {
        Some(name) => generated_dir.join(name),
        None => generated_dir.to_path_buf(),
    }
}

fn diff_wallpaper(
    desired: Option<&str>,
    observed: &ObservedState,
    ctx: &DiffContext,
) -> Option<WallpaperDiff> {
    let to = ctx.expand(desired?);
    if observed.wallpaper.as_deref() == Some(to.as_path()) {
        return None;
    }
    Some(WallpaperDiff {
        from: observed.wallpaper.clone(),
        to,
    })
}

/// Dock apps are reconciled as a set against the currently persistent
/// apps: removals first (in Dock order), then additions in declared order.
pub fn diff_dock(desired: &[DockApp], current: &[String]) -> Vec<DockDiff> {
    let wanted: HashSet<String> = desired.iter().map(DockApp::label).collect();
    let present: HashSet<&str> = current.iter().map(String::as_str).collect();

    let removals = current
        .iter()
        .filter(|name| !wanted.contains(name.as_str()))
        .map(|name| DockDiff {
            action: DiffAction::Remove,
            name: name.clone(),
            path: None,
            position: None,
        });

    let additions = desired.iter().map(|app| {
        let label = app.label();
        let action = if present.contains(label.as_str()) {
            DiffAction::None
        } else {
            DiffAction::Add
        };
        DockDiff {
            action,
            name: label,
            path: Some(app.bundle_path()),
            position: app.position,
        }
    });

    removals.chain(additions).collect()
}
