//! git configuration values

use anyhow::{Context, Result};
use declarative::{ApplyResult, CommandRunner, DiffAction, GitDiff, GitKey};
use std::collections::BTreeMap;

use super::run_step;

/// Current values of `keys`. Unset keys and failed reads are omitted.
pub fn read(runner: &dyn CommandRunner, keys: &[GitKey]) -> BTreeMap<GitKey, String> {
    keys.iter()
        .filter_map(|key| {
            let value = runner
                .run_capture("git", &["config", key.scope.flag(), key.key.as_str()])
                .ok()?;
            let value = value.trim();
            (!value.is_empty()).then(|| (key.clone(), value.to_string()))
        })
        .collect()
}

pub fn apply(runner: &dyn CommandRunner, entry: &GitDiff) -> Result<ApplyResult> {
    let (scope, key) = (entry.scope, entry.key.as_str());
    match entry.action {
        DiffAction::Add | DiffAction::Update => {
            let value = entry
                .desired
                .as_deref()
                .with_context(|| format!("No desired value for git config {scope} {key}"))?;
            let (done, verb) = if entry.action == DiffAction::Add {
                ("Added", "add")
            } else {
                ("Updated", "update")
            };
            run_step(
                runner,
                "git",
                &["config", scope.flag(), key, value],
                format!("{done} git config: {scope} {key} = {value}"),
                format!("Failed to {verb} git config: {scope} {key}"),
            )
        }
        DiffAction::Remove => run_step(
            runner,
            "git",
            &["config", scope.flag(), "--unset", key],
            format!("Removed git config: {scope} {key}"),
            format!("Failed to remove git config: {scope} {key}"),
        ),
        DiffAction::None => Ok(ApplyResult::ok(format!(
            "No change needed for git config {scope} {key}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::MockRunner;
    use declarative::{CommandOutput, GitScope};

    fn key(scope: GitScope, key: &str) -> GitKey {
        GitKey {
            scope,
            key: key.to_string(),
        }
    }

    #[test]
    fn test_read_omits_unset_keys() {
        let runner = MockRunner::new()
            .stdout("git config --global user.name", "Jane Doe\n")
            .on("git config --global user.email", CommandOutput::failure(1, ""))
            .stdout("git config --local core.editor", "\n");
        let keys = [
            key(GitScope::Global, "user.name"),
            key(GitScope::Global, "user.email"),
            key(GitScope::Local, "core.editor"),
        ];

        let values = read(&runner, &keys);
        assert_eq!(values.len(), 1);
        assert_eq!(values[&keys[0]], "Jane Doe");
    }

    #[test]
    fn test_set_value_with_spaces() {
        let runner = MockRunner::new();
        let entry = GitDiff {
            action: DiffAction::Update,
            scope: GitScope::Global,
            key: "user.name".into(),
            current: Some("jane".into()),
            desired: Some("Jane Doe".into()),
        };
        let result = apply(&runner, &entry).unwrap();
        assert_eq!(
            result.message,
            "Updated git config: global user.name = Jane Doe"
        );
        assert_eq!(runner.calls(), vec!["git config --global user.name Jane Doe"]);
    }

    #[test]
    fn test_set_failure() {
        let runner = MockRunner::new().fail("git config --system", "Permission denied");
        let entry = GitDiff {
            action: DiffAction::Add,
            scope: GitScope::System,
            key: "core.autocrlf".into(),
            current: None,
            desired: Some("input".into()),
        };
        let result = apply(&runner, &entry).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.message, "Failed to add git config: system core.autocrlf");
    }
}
