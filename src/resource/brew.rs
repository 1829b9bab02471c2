//! Homebrew formulae and casks

use anyhow::Result;
use declarative::{ApplyResult, CommandRunner, DiffAction, PackageDiff};
use std::collections::BTreeMap;

use super::run_step;

/// Homebrew package kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Formula,
    Cask,
}

impl Kind {
    fn list_flag(self) -> &'static str {
        match self {
            Self::Formula => "--formula",
            Self::Cask => "--cask",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Formula => "package",
            Self::Cask => "cask",
        }
    }
}

/// Installed packages of one kind with their versions
pub fn list(runner: &dyn CommandRunner, kind: Kind) -> Result<BTreeMap<String, String>> {
    let stdout = runner.run_capture("brew", &["list", kind.list_flag(), "--versions"])?;
    Ok(parse_versions(&stdout))
}

/// Parse `brew list --versions` output: `name version [version..]` per line.
pub fn parse_versions(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let version = parts.collect::<Vec<_>>().join(" ");
            let version = if version.is_empty() {
                "unknown".to_string()
            } else {
                version
            };
            Some((name.to_string(), version))
        })
        .collect()
}

pub fn apply(runner: &dyn CommandRunner, kind: Kind, entry: &PackageDiff) -> Result<ApplyResult> {
    let (verb, past, present) = match entry.action {
        DiffAction::Add => ("install", "Installed", "install"),
        DiffAction::Remove => ("uninstall", "Uninstalled", "uninstall"),
        DiffAction::Update => ("upgrade", "Updated", "update"),
        DiffAction::None => {
            return Ok(ApplyResult::ok(format!(
                "No change needed for {} {}",
                kind.label(),
                entry.name
            )));
        }
    };

    let mut args = vec![verb];
    if kind == Kind::Cask {
        args.push("--cask");
    }
    args.push(&entry.name);

    let label = kind.label();
    run_step(
        runner,
        "brew",
        &args,
        format!("{past} {label}: {}", entry.name),
        format!("Failed to {present} {label}: {}", entry.name),
    )
}
