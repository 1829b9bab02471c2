//! Desktop picture via AppleScript

use anyhow::Result;
use declarative::{ApplyResult, CommandRunner, WallpaperDiff};
use std::path::{Path, PathBuf};

use super::run_step;

const READ_SCRIPT: &str = r#"tell application "System Events"
  tell every desktop
    get picture
  end tell
end tell"#;

/// Picture of the first desktop
pub fn current(runner: &dyn CommandRunner) -> Result<Option<PathBuf>> {
    let stdout = runner.run_capture("osascript", &["-e", READ_SCRIPT])?;
    Ok(parse_current(&stdout))
}

/// `get picture` on every desktop yields a comma-separated list.
pub fn parse_current(stdout: &str) -> Option<PathBuf> {
    stdout
        .trim()
        .split(", ")
        .next()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

fn set_script(path: &Path) -> String {
    let escaped = path
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    format!(
        r#"tell application "System Events"
  tell every desktop
    set picture to "{escaped}"
  end tell
end tell"#
    )
}

pub fn apply(runner: &dyn CommandRunner, entry: &WallpaperDiff) -> Result<ApplyResult> {
    let path = entry.to.display();
    if !entry.to.exists() {
        return Ok(ApplyResult::failed(
            "Failed to set wallpaper",
            format!("Wallpaper file not found: {path}"),
        ));
    }
    let script = set_script(&entry.to);
    run_step(
        runner,
        "osascript",
        &["-e", script.as_str()],
        format!("Set wallpaper: {path}"),
        "Failed to set wallpaper".to_string(),
    )
}
