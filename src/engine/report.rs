//! Terminal callbacks for a reconciliation run

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, Diff, ExecuteSummary, ProgressCallback};

use indicatif::ProgressBar;

use super::differ::display_diff;
use crate::{progress, ui};

/// Prints the diff, one line per executed entry, and restarts
pub struct TerminalProgress {
    verbose: bool,
    /// Spinner shown while observed state is collected
    collecting: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            collecting: None,
        }
    }

    /// Clear `spinner` once the diff is ready.
    #[must_use]
    pub fn with_spinner(mut self, spinner: ProgressBar) -> Self {
        self.collecting = Some(spinner);
        self
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_diff(&mut self, diff: &Diff) {
        if let Some(spinner) = self.collecting.take() {
            progress::finish_success(&spinner, "Collected current state");
        }
        display_diff(diff);
    }

    fn on_domain_start(&mut self, domain: &str, count: usize) {
        println!();
        println!(
            "  {} {} ({})",
            "→".cyan(),
            domain_title(domain).bold(),
            count
        );
    }

    fn on_result(&mut self, result: &ApplyResult) {
        if result.is_success() {
            println!("    {} {}", "✓".green(), result.message);
            return;
        }
        println!("    {} {}", "✗".red(), result.message);
        if self.verbose
            && let Some(error) = &result.error
        {
            for line in error.lines() {
                println!("      {}", line.dimmed());
            }
        }
    }

    fn on_restart(&mut self, subsystem: &str) {
        println!("    {} Restarted {}", "↻".cyan(), subsystem);
    }
}

fn domain_title(domain: &str) -> &str {
    match domain {
        "packages" => "Packages",
        "casks" => "Casks",
        "apps" => "App Store",
        "settings" => "macOS settings",
        "dock" => "Dock",
        "wallpaper" => "Wallpaper",
        "git" => "Git config",
        "files" => "Files",
        other => other,
    }
}

/// Asks on the terminal before applying
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        println!();
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        ui::success(&format!(
            "Configuration applied: {}",
            ui::plural(summary.succeeded, "step").bold()
        ));
    } else {
        ui::warn(&format!(
            "Configuration applied with errors: {} succeeded, {}",
            summary.succeeded,
            ui::plural(summary.failed, "failure").red()
        ));
        ui::dim("Re-run with -v to see error details");
    }
}
