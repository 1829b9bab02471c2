//! Dock persistent apps via `dockutil`

use anyhow::{Result, bail};
use declarative::{ApplyResult, CommandRunner, DiffAction, DockDiff};

use super::run_step;
use crate::runner::command_exists;

const DOCKUTIL_MISSING: &str = "dockutil not installed. Install with: brew install dockutil";

/// Persistent Dock apps, in Dock order
pub fn list(runner: &dyn CommandRunner) -> Result<Vec<String>> {
    if !command_exists(runner, "dockutil") {
        bail!(DOCKUTIL_MISSING);
    }
    let stdout = runner.run_capture("dockutil", &["--list"])?;
    Ok(parse_list(&stdout))
}

/// Names of `persistentApps` rows in `dockutil --list` output.
pub fn parse_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.contains("persistentApps"))
        .filter_map(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn apply(runner: &dyn CommandRunner, entry: &DockDiff) -> Result<ApplyResult> {
    let name = entry.name.as_str();
    match entry.action {
        DiffAction::Remove => run_step(
            runner,
            "dockutil",
            &["--remove", name, "--no-restart"],
            format!("Removed {name} from Dock"),
            format!("Failed to remove {name} from Dock"),
        ),
        DiffAction::Add | DiffAction::Update => {
            let Some(path) = entry.path.as_deref() else {
                bail!("No app path for {name}");
            };
            let position = entry.position.map(|p| p.to_string());
            let mut args = vec!["--add", path, "--no-restart"];
            if let Some(position) = &position {
                args.extend(["--position", position.as_str()]);
            }
            run_step(
                runner,
                "dockutil",
                &args,
                format!("Added {name} to Dock"),
                format!("Failed to add {name} to Dock"),
            )
        }
        DiffAction::None => Ok(ApplyResult::ok(format!("{name} already in Dock"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::MockRunner;

    const LIST: &str = "Safari\tfile:///Applications/Safari.app/\tpersistentApps\t/Users/jane/Library/Preferences/com.apple.dock.plist\n\
Mail\tfile:///System/Applications/Mail.app/\tpersistentApps\t/Users/jane/Library/Preferences/com.apple.dock.plist\n\
Downloads\tfile:///Users/jane/Downloads/\tpersistentOthers\t/Users/jane/Library/Preferences/com.apple.dock.plist\n";

    #[test]
    fn test_parse_list_keeps_persistent_apps() {
        assert_eq!(parse_list(LIST), vec!["Safari", "Mail"]);
    }

    #[test]
    fn test_list_requires_dockutil() {
        let runner = MockRunner::new().fail("which dockutil", "");
        let err = list(&runner).unwrap_err();
        assert!(err.to_string().contains("brew install dockutil"));
    }

    #[test]
    fn test_add_with_position() {
        let runner = MockRunner::new();
        let entry = DockDiff {
            action: DiffAction::Add,
            name: "Notes".into(),
            path: Some("/System/Applications/Notes.app".into()),
            position: Some(3),
        };
        let result = apply(&runner, &entry).unwrap();
        assert_eq!(result.message, "Added Notes to Dock");
        assert_eq!(
            runner.calls(),
            vec!["dockutil --add /System/Applications/Notes.app --no-restart --position 3"]
        );
    }

    #[test]
    fn test_remove_failure() {
        let runner = MockRunner::new().fail("dockutil --remove", "item not found");
        let entry = DockDiff {
            action: DiffAction::Remove,
            name: "Maps".into(),
            path: None,
            position: None,
        };
        let result = apply(&runner, &entry).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.message, "Failed to remove Maps from Dock");
        assert_eq!(runner.calls(), vec!["dockutil --remove Maps --no-restart"]);
    }
}
