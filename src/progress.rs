//! Progress indicators for the mactide CLI

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for indeterminate work; hidden when `quiet`.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Replace the spinner with a success line.
pub fn finish_success(pb: &ProgressBar, message: &str) {
    if pb.is_hidden() {
        return;
    }
    pb.finish_and_clear();
    println!("{} {}", "✓".green(), message);
}

pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}
