//! macOS preference domains via `defaults`

use anyhow::{Context, Result};
use declarative::{
    ApplyResult, CommandRunner, DiffAction, SettingDiff, SettingKey, Value, format_write_args,
    infer_type,
};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use super::run_step;

/// Current values of every key in the given domains.
///
/// A domain that cannot be exported is skipped, so its keys read as
/// absent. Failing to run `defaults` at all is an error.
pub fn read_domains(
    runner: &dyn CommandRunner,
    domains: &BTreeSet<String>,
) -> Result<BTreeMap<SettingKey, Value>> {
    let mut settings = BTreeMap::new();
    for domain in domains {
        let output = runner.run("defaults", &["export", domain.as_str(), "-"])?;
        if !output.is_success() {
            log::debug!(
                "Skipping domain {domain}: {}",
                output.stderr_str().trim()
            );
            continue;
        }
        for (key, value) in parse_export(&output.stdout)
            .with_context(|| format!("Failed to decode preferences for {domain}"))?
        {
            settings.insert(SettingKey::new(domain, &key), value);
        }
    }
    Ok(settings)
}

/// Decode a `defaults export` plist into typed values.
///
/// Data blobs, arrays of non-scalars and other shapes that cannot be
/// written back are kept as an opaque placeholder string, so the key still
/// reads as present.
pub fn parse_export(bytes: &[u8]) -> Result<BTreeMap<String, Value>> {
    let root = plist::Value::from_reader(Cursor::new(bytes))
        .context("Failed to parse plist output")?;
    let plist::Value::Dictionary(dict) = root else {
        anyhow::bail!("Expected plist dictionary at root");
    };
    Ok(dict
        .into_iter()
        .map(|(key, value)| {
            let value = convert(&key, value);
            (key, value)
        })
        .collect())
}

fn convert(path: &str, value: plist::Value) -> Value {
    match value {
        plist::Value::Array(items) => {
            let scalars: Option<Vec<String>> = items
                .iter()
                .map(|item| convert_scalar(item.clone()).map(|v| v.to_string()))
                .collect();
            match scalars {
                Some(scalars) => Value::StringArray(scalars),
                None => opaque(path, &plist::Value::Array(items)),
            }
        }
        plist::Value::Dictionary(dict) => Value::Dict(
            dict.into_iter()
                .map(|(key, value)| {
                    let value = convert(&format!("{path}.{key}"), value);
                    (key, value)
                })
                .collect(),
        ),
        scalar => match convert_scalar(scalar.clone()) {
            Some(value) => value,
            None => opaque(path, &scalar),
        },
    }
}

fn convert_scalar(value: plist::Value) -> Option<Value> {
    match value {
        plist::Value::Boolean(b) => Some(Value::Bool(b)),
        plist::Value::Integer(i) => match i.as_signed() {
            Some(i) => Some(Value::Int(i)),
            None => i.as_unsigned().map(|u| Value::String(u.to_string())),
        },
        plist::Value::Real(x) => Some(Value::Float(x)),
        plist::Value::String(s) => Some(Value::String(s)),
        plist::Value::Date(date) => Some(Value::String(date.to_xml_format())),
        _ => None,
    }
}

/// Placeholder for a value mactide cannot represent.
fn opaque(path: &str, value: &plist::Value) -> Value {
    let placeholder = match value {
        plist::Value::Data(bytes) => format!("<data: {} bytes>", bytes.len()),
        plist::Value::Array(items) => format!("<array: {} items>", items.len()),
        _ => "<unsupported>".to_string(),
    };
    log::debug!("Unsupported preference value at {path}, read as {placeholder}");
    Value::String(placeholder)
}

pub fn apply(runner: &dyn CommandRunner, entry: &SettingDiff) -> Result<ApplyResult> {
    let (domain, key) = (entry.domain.as_str(), entry.key.as_str());
    match entry.action {
        DiffAction::Add | DiffAction::Update => {
            let desired = entry
                .desired
                .as_ref()
                .with_context(|| format!("No desired value for {domain} {key}"))?;
            let value_type = entry.value_type.unwrap_or_else(|| infer_type(desired));
            let verb = if entry.action == DiffAction::Add {
                ("Added", "add")
            } else {
                ("Updated", "update")
            };
            let typed = match format_write_args(desired, value_type) {
                Ok(typed) => typed,
                Err(e) => {
                    return Ok(ApplyResult::failed(
                        format!("Failed to {} setting: {domain} {key}", verb.1),
                        e.to_string(),
                    ));
                }
            };
            let mut args = vec!["write", domain, key];
            args.extend(typed.iter().map(String::as_str));
            run_step(
                runner,
                "defaults",
                &args,
                format!("{} setting: {domain} {key} = {desired}", verb.0),
                format!("Failed to {} setting: {domain} {key}", verb.1),
            )
        }
        DiffAction::Remove => run_step(
            runner,
            "defaults",
            &["delete", domain, key],
            format!("Deleted setting: {domain} {key}"),
            format!("Failed to delete setting: {domain} {key}"),
        ),
        DiffAction::None => Ok(ApplyResult::ok(format!(
            "No change needed for {domain} {key}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::MockRunner;
    use declarative::ValueType;

    const DOCK_EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>autohide</key>
	<true/>
	<key>tilesize</key>
	<integer>48</integer>
	<key>autohide-delay</key>
	<real>0.5</real>
	<key>orientation</key>
	<string>left</string>
	<key>hot-corners</key>
	<array>
		<string>tl</string>
		<integer>4</integer>
	</array>
	<key>persistent-apps</key>
	<array>
		<dict>
			<key>tile-type</key>
			<string>file-tile</string>
		</dict>
	</array>
	<key>blob</key>
	<data>AAEC</data>
	<key>nested</key>
	<dict>
		<key>enabled</key>
		<false/>
	</dict>
</dict>
</plist>
"#;

    fn setting(action: DiffAction, desired: Option<Value>, ty: Option<ValueType>) -> SettingDiff {
        SettingDiff {
            action,
            domain: "com.apple.dock".into(),
            key: "tilesize".into(),
            current: None,
            desired,
            value_type: ty,
        }
    }

    #[test]
    fn test_parse_export_types() {
        let values = parse_export(DOCK_EXPORT.as_bytes()).unwrap();
        assert_eq!(values["autohide"], Value::Bool(true));
        assert_eq!(values["tilesize"], Value::Int(48));
        assert_eq!(values["autohide-delay"], Value::Float(0.5));
        assert_eq!(values["orientation"], Value::String("left".into()));
        assert_eq!(
            values["hot-corners"],
            Value::StringArray(vec!["tl".into(), "4".into()])
        );
        assert_eq!(
            values["nested"],
            Value::Dict(BTreeMap::from([("enabled".into(), Value::Bool(false))]))
        );
        assert_eq!(
            values["persistent-apps"],
            Value::String("<array: 1 items>".into())
        );
        assert_eq!(values["blob"], Value::String("<data: 3 bytes>".into()));
    }

    #[test]
    fn test_unsupported_recorded_key_still_removable() {
        use declarative::{DesiredConfig, DiffContext, PersistedRecord, compute_diff};

        let runner = MockRunner::new().stdout("defaults export com.apple.dock", DOCK_EXPORT);
        let domains = BTreeSet::from(["com.apple.dock".to_string()]);
        let blob = SettingKey::new("com.apple.dock", "blob");

        let observed = declarative::ObservedState {
            settings: read_domains(&runner, &domains).unwrap(),
            ..Default::default()
        };
        let diff = compute_diff(
            &DesiredConfig::default(),
            &observed,
            &PersistedRecord::new(vec![blob.clone()]),
            &DiffContext::new("/Users/jane", "/tmp"),
        );
        assert_eq!(diff.settings.len(), 1);
        assert_eq!(diff.settings[0].action, DiffAction::Remove);
        assert_eq!(diff.settings[0].identity(), blob);
    }

    #[test]
    fn test_read_domains_skips_failed_export() {
        let runner = MockRunner::new()
            .stdout("defaults export com.apple.dock", DOCK_EXPORT)
            .fail("defaults export com.example.gone", "Domain does not exist");
        let domains = BTreeSet::from(["com.apple.dock".to_string(), "com.example.gone".into()]);

        let settings = read_domains(&runner, &domains).unwrap();
        assert_eq!(
            settings[&SettingKey::new("com.apple.dock", "tilesize")],
            Value::Int(48)
        );
        assert!(settings.keys().all(|k| k.domain == "com.apple.dock"));
        assert_eq!(
            runner.calls(),
            vec![
                "defaults export com.apple.dock -",
                "defaults export com.example.gone -"
            ]
        );
    }

    #[test]
    fn test_read_domains_fails_without_defaults() {
        let runner = MockRunner::new().missing("defaults");
        let domains = BTreeSet::from(["com.apple.dock".to_string()]);
        assert!(read_domains(&runner, &domains).is_err());
    }

    #[test]
    fn test_write_with_inferred_type() {
        let runner = MockRunner::new();
        let result = apply(
            &runner,
            &setting(DiffAction::Update, Some(Value::Int(36)), None),
        )
        .unwrap();
        assert_eq!(result.message, "Updated setting: com.apple.dock tilesize = 36");
        assert_eq!(
            runner.calls(),
            vec!["defaults write com.apple.dock tilesize -int 36"]
        );
    }

    #[test]
    fn test_write_array_expands_elements() {
        let runner = MockRunner::new();
        let value = Value::StringArray(vec!["a".into(), "b c".into()]);
        let result = apply(&runner, &setting(DiffAction::Add, Some(value), None)).unwrap();
        assert!(result.message.starts_with("Added setting"));
        assert_eq!(
            runner.calls(),
            vec!["defaults write com.apple.dock tilesize -array a b c"]
        );
    }

    #[test]
    fn test_write_incompatible_type_fails_without_running() {
        let runner = MockRunner::new();
        let result = apply(
            &runner,
            &setting(
                DiffAction::Add,
                Some(Value::String("big".into())),
                Some(ValueType::Int),
            ),
        )
        .unwrap();
        assert!(!result.is_success());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_delete() {
        let runner = MockRunner::new().fail("defaults delete", "Domain not found");
        let result = apply(&runner, &setting(DiffAction::Remove, None, None)).unwrap();
        assert!(!result.is_success());
        assert_eq!(
            result.message,
            "Failed to delete setting: com.apple.dock tilesize"
        );
        assert_eq!(result.error.as_deref(), Some("Domain not found"));
    }
}
