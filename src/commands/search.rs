//! `search` - find App Store ids for the `[appstore]` section

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::resource::appstore::{self, SearchResult};
use crate::runner::SystemRunner;
use crate::{progress, ui};

pub fn run(ctx: &Context, query: &[String]) -> Result<()> {
    let query = query.join(" ");
    let spinner = progress::spinner(&format!("Searching App Store for \"{query}\"..."), ctx.quiet);
    let results = appstore::search(&SystemRunner, &query);
    progress::finish_clear(&spinner);
    let results = results?;

    if results.is_empty() {
        ui::warn(&format!("No apps found for \"{query}\""));
        return Ok(());
    }

    ui::header(&format!("App Store results for \"{query}\""));
    for result in &results {
        println!(
            "  {}  {}",
            config_snippet(result),
            format!("# {}", result.version).dimmed()
        );
    }
    println!();
    ui::dim("Paste entries into the `apps` list of the [appstore] section.");
    Ok(())
}

/// Inline TOML table for one result.
fn config_snippet(result: &SearchResult) -> String {
    format!(
        "{{ id = {}, name = {} }}",
        result.id,
        toml::Value::String(result.name.clone())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_snippet_parses_as_app() {
        let result = SearchResult {
            id: 424_389_933,
            name: "Final Cut \"Pro\"".into(),
            version: "10.7".into(),
        };
        let snippet = config_snippet(&result);
        assert!(snippet.starts_with("{ id = 424389933, name = "));

        let doc = format!("[appstore]\napps = [{snippet}]\n");
        let config = declarative::DesiredConfig::from_toml(&doc).unwrap();
        assert_eq!(config.appstore.apps[0].id, 424_389_933);
        assert_eq!(config.appstore.apps[0].name, "Final Cut \"Pro\"");
    }
}
