//! Diff display

use colored::{ColoredString, Colorize};
use declarative::{Diff, DiffAction, PackageDiff};

/// One rendered diff entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub action: DiffAction,
    pub label: String,
    pub detail: String,
}

impl DiffLine {
    fn new(action: DiffAction, label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            action,
            label: label.into(),
            detail: detail.into(),
        }
    }
}

/// Non-trivial entries grouped by section, in apply order.
pub fn diff_sections(diff: &Diff) -> Vec<(&'static str, Vec<DiffLine>)> {
    let apps = diff
        .apps
        .iter()
        .filter(|e| e.action.is_change())
        .map(|e| {
            let detail = if e.action == DiffAction::Remove {
                "(not in config, remove manually)"
            } else {
                "(not installed)"
            };
            DiffLine::new(e.action, format!("{} ({})", e.name, e.id), detail)
        })
        .collect();

    let settings = diff
        .settings
        .iter()
        .filter(|e| e.action.is_change())
        .map(|e| {
            let detail = match (&e.current, &e.desired) {
                (Some(current), Some(desired)) => format!("{current} → {desired}"),
                (None, Some(desired)) => format!("(unset) → {desired}"),
                (Some(current), None) => format!("{current} → (delete)"),
                (None, None) => String::new(),
            };
            DiffLine::new(e.action, e.identity().to_string(), detail)
        })
        .collect();

    let dock = diff
        .dock
        .iter()
        .filter(|e| e.action.is_change())
        .map(|e| {
            let detail = match (e.action, e.position) {
                (DiffAction::Remove, _) => "(not in config)".to_string(),
                (_, Some(position)) => format!("position {position}"),
                (_, None) => String::new(),
            };
            DiffLine::new(e.action, &e.name, detail)
        })
        .collect();

    let wallpaper = diff
        .wallpaper
        .iter()
        .map(|w| {
            let from = w
                .from
                .as_ref()
                .map_or_else(|| "(unknown)".to_string(), |p| p.display().to_string());
            DiffLine::new(
                DiffAction::Update,
                w.to.display().to_string(),
                format!("was {from}"),
            )
        })
        .collect();

    let git = diff
        .git
        .iter()
        .filter(|e| e.action.is_change())
        .map(|e| {
            let desired = e.desired.as_deref().unwrap_or_default();
            let detail = match &e.current {
                Some(current) => format!("{current} → {desired}"),
                None => format!("(unset) → {desired}"),
            };
            DiffLine::new(e.action, format!("{} {}", e.scope, e.key), detail)
        })
        .collect();

    let files = diff
        .files
        .iter()
        .filter(|e| e.action.is_change())
        .map(|e| {
            let detail = match &e.current_target {
                Some(current) => format!("{} (was {})", e.source, current.display()),
                None => e.source.clone(),
            };
            DiffLine::new(e.action, &e.target, detail)
        })
        .collect();

    vec![
        ("Packages (brew formulas)", package_lines(&diff.packages)),
        ("Packages (brew casks)", package_lines(&diff.casks)),
        ("App Store", apps),
        ("Defaults (macOS)", settings),
        ("Dock", dock),
        ("Wallpaper", wallpaper),
        ("Git config", git),
        ("Files", files),
    ]
    .into_iter()
    .filter(|(_, lines)| !lines.is_empty())
    .collect()
}

fn package_lines(entries: &[PackageDiff]) -> Vec<DiffLine> {
    entries
        .iter()
        .filter(|e| e.action.is_change())
        .map(|e| {
            let detail = match (e.action, &e.current_version) {
                (DiffAction::Add, _) => "(not installed)".to_string(),
                (DiffAction::Remove, Some(v)) => format!("{v} (not in config)"),
                (_, Some(v)) => v.clone(),
                (_, None) => String::new(),
            };
            DiffLine::new(e.action, &e.name, detail)
        })
        .collect()
}

fn symbol(action: DiffAction) -> ColoredString {
    match action {
        DiffAction::Add => "+".green(),
        DiffAction::Update => "~".yellow(),
        DiffAction::Remove => "-".red(),
        DiffAction::None => " ".normal(),
    }
}

/// Display a diff in a user-friendly format
pub fn display_diff(diff: &Diff) {
    let sections = diff_sections(diff);

    if sections.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for (title, lines) in &sections {
        println!("│ {}", title.bold());
        for line in lines {
            println!(
                "│   {} {:<40} {}",
                symbol(line.action),
                line.label,
                line.detail.dimmed()
            );
        }
        println!("│");
    }

    let summary = diff.summary();
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to add, {} to update, {} to remove, {} unchanged",
        summary.additions.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.removals.to_string().red(),
        summary.unchanged.to_string().dimmed()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
