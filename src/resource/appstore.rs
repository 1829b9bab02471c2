//! Mac App Store apps via the `mas` CLI

use anyhow::{Result, bail};
use declarative::{AppDiff, ApplyResult, CommandRunner, DiffAction};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use super::run_step;
use crate::runner::command_exists;

const MAS_MISSING: &str = "mas CLI is not installed. Install with: brew install mas";
const MAS_CANNOT_UNINSTALL: &str =
    "mas CLI does not support uninstalling apps. Please uninstall manually.";

/// One `mas search` hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub id: u64,
    pub name: String,
    pub version: String,
}

/// Installed App Store apps by id
pub fn list(runner: &dyn CommandRunner) -> Result<BTreeMap<u64, String>> {
    if !command_exists(runner, "mas") {
        bail!(MAS_MISSING);
    }
    let stdout = runner.run_capture("mas", &["list"])?;
    parse_list(&stdout)
}

/// Parse `mas list`: `<id>  <name>  (<version>)` per line.
pub fn parse_list(stdout: &str) -> Result<BTreeMap<u64, String>> {
    let line_re = Regex::new(r"^(\d+)\s+(.+?)\s+\(")?;
    Ok(stdout
        .lines()
        .filter_map(|line| {
            let caps = line_re.captures(line.trim())?;
            let id = caps[1].parse().ok()?;
            Some((id, caps[2].trim().to_string()))
        })
        .collect())
}

/// Search the App Store
pub fn search(runner: &dyn CommandRunner, query: &str) -> Result<Vec<SearchResult>> {
    if !command_exists(runner, "mas") {
        bail!(MAS_MISSING);
    }
    let stdout = runner.run_capture("mas", &["search", query])?;
    parse_search(&stdout)
}

/// Parse `mas search`: `<id>  <name>  (<version>)` per line.
pub fn parse_search(stdout: &str) -> Result<Vec<SearchResult>> {
    let line_re = Regex::new(r"^(\d+)\s+(.+?)\s+\((.+?)\)")?;
    Ok(stdout
        .lines()
        .filter_map(|line| {
            let caps = line_re.captures(line.trim())?;
            Some(SearchResult {
                id: caps[1].parse().ok()?,
                name: caps[2].trim().to_string(),
                version: caps[3].trim().to_string(),
            })
        })
        .collect())
}

pub fn apply(runner: &dyn CommandRunner, entry: &AppDiff) -> Result<ApplyResult> {
    match entry.action {
        DiffAction::Add => {
            if !command_exists(runner, "mas") {
                return Ok(ApplyResult::failed(
                    format!("Failed to install {}", entry.name),
                    MAS_MISSING,
                ));
            }
            let id = entry.id.to_string();
            run_step(
                runner,
                "mas",
                &["install", id.as_str()],
                format!("Installed {}", entry.name),
                format!("Failed to install {}", entry.name),
            )
        }
        DiffAction::Remove => Ok(ApplyResult::failed(
            format!("Cannot uninstall {} ({})", entry.name, entry.id),
            MAS_CANNOT_UNINSTALL,
        )),
        DiffAction::Update | DiffAction::None => Ok(ApplyResult::ok(format!(
            "No change needed for {}",
            entry.name
        ))),
    }
}
