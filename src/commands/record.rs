//! `record` - show which settings mactide currently manages

use anyhow::Result;
use colored::Colorize;
use declarative::{PersistedRecord, RecordStore};
use std::collections::BTreeMap;

use crate::Context;
use crate::{paths, ui};

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let store = RecordStore::new(paths::record_file()?);
    let record = store.load();

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    ui::header("Settings Record");
    ui::kv("Path", &store.path().display().to_string());
    let updated = record
        .updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    ui::kv("Updated", &updated);

    if record.is_empty() {
        println!();
        ui::dim("No settings recorded");
        return Ok(());
    }

    for (domain, keys) in by_domain(&record) {
        ui::section(domain);
        for key in keys {
            println!("  {} {}", "•".dimmed(), key);
        }
    }

    if !ctx.quiet {
        println!();
        ui::dim(&format!(
            "{} managed; removing one from the config deletes it on the next apply",
            ui::plural(record.settings.len(), "setting")
        ));
    }
    Ok(())
}

fn by_domain(record: &PersistedRecord) -> BTreeMap<&str, Vec<&str>> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for setting in &record.settings {
        grouped
            .entry(setting.domain.as_str())
            .or_default()
            .push(setting.key.as_str());
    }
    grouped
}
