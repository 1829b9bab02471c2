//! Managed files: generated copies linked into place

use anyhow::{Context, Result, bail};
use declarative::{ApplyResult, DiffAction, FileDiff};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved link destination for every target that is a symlink.
pub fn read_links(targets: &[PathBuf]) -> BTreeMap<PathBuf, PathBuf> {
    targets
        .iter()
        .filter(|target| target.is_symlink())
        .filter_map(|target| match fs::read_link(target) {
            Ok(dest) => Some((target.clone(), resolve_link(target, dest))),
            Err(e) => {
                log::debug!("Failed to read symlink {}: {e}", target.display());
                None
            }
        })
        .collect()
}

/// Relative link destinations are relative to the link's directory.
fn resolve_link(target: &Path, dest: PathBuf) -> PathBuf {
    if dest.is_absolute() {
        return dest;
    }
    match target.parent() {
        Some(parent) => parent.join(dest),
        None => dest,
    }
}

pub fn apply(base_dir: &Path, entry: &FileDiff) -> Result<ApplyResult> {
    let target = entry.target_path.display();
    match entry.action {
        DiffAction::Add | DiffAction::Update => {
            let generated = entry.expected_target.display();
            let (done, verb) = if entry.action == DiffAction::Add {
                ("Created", "add")
            } else {
                ("Updated", "update")
            };
            Ok(match link(base_dir, entry) {
                Ok(()) => ApplyResult::ok(format!("{done} symlink: {target} -> {generated}")),
                Err(e) => {
                    ApplyResult::failed(format!("Failed to {verb} file: {target}"), format!("{e:#}"))
                }
            })
        }
        DiffAction::Remove => Ok(match remove_link(&entry.target_path) {
            Ok(()) => ApplyResult::ok(format!("Removed symlink: {target}")),
            Err(e) => {
                ApplyResult::failed(format!("Failed to remove symlink: {target}"), format!("{e:#}"))
            }
        }),
        DiffAction::None => Ok(ApplyResult::ok(format!("No change needed for {target}"))),
    }
}

/// Regenerate the contents, move any regular file aside, then link.
///
/// A regular file at the target without `backup` is refused before
/// anything is written.
fn link(base_dir: &Path, entry: &FileDiff) -> Result<()> {
    let target = &entry.target_path;
    let occupied = !target.is_symlink() && target.exists();
    if occupied && !entry.backup {
        bail!(
            "{} exists and is not a symlink; set backup = true to move it aside",
            target.display()
        );
    }

    let source = source_path(base_dir, &entry.source);
    let contents = fs::read(&source)
        .with_context(|| format!("Failed to read source: {}", source.display()))?;

    let generated = &entry.expected_target;
    if let Some(dir) = generated.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    fs::write(generated, contents)
        .with_context(|| format!("Failed to write {}", generated.display()))?;

    if occupied {
        let backup = backup_path(target);
        fs::rename(target, &backup)
            .with_context(|| format!("Failed to back up to {}", backup.display()))?;
        log::info!("Backed up {} to {}", target.display(), backup.display());
    } else if target.is_symlink() {
        fs::remove_file(target).with_context(|| {
            format!("Failed to remove existing symlink: {}", target.display())
        })?;
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create parent directory: {}", parent.display())
        })?;
    }
    symlink(generated, target)
}

fn remove_link(target: &Path) -> Result<()> {
    if !target.is_symlink() {
        bail!("{} is not a symlink", target.display());
    }
    fs::remove_file(target).with_context(|| format!("Failed to remove {}", target.display()))
}

fn source_path(base_dir: &Path, source: &str) -> PathBuf {
    let expanded = crate::paths::expand(source);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// `<target>.backup`
fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(source, target).with_context(|| {
        format!(
            "Failed to create symlink: {} -> {}",
            target.display(),
            source.display()
        )
    })
}

#[cfg(not(unix))]
fn symlink(_source: &Path, _target: &Path) -> Result<()> {
    bail!("Symlinks not supported on this platform")
}
