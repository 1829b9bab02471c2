//! `apply` and `diff`

use anyhow::{Result, bail};
use declarative::{
    AutoConfirm, Collector, GitKey, Outcome, RecordStore, Session, SettingKey, Value,
};
use indicatif::ProgressBar;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::cli::{ApplyArgs, DiffArgs};
use crate::config::LoadedConfig;
use crate::engine::{PromptConfirm, TerminalProgress, print_summary};
use crate::resource::{SystemCollector, SystemExecutor};
use crate::runner::SystemRunner;
use crate::{paths, progress, ui};

pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let options = RunOptions {
        dry_run: args.dry_run,
        strict: args.strict,
        yes: args.yes,
    };
    run(ctx, args.config.as_deref(), options)
}

pub fn diff(ctx: &Context, args: DiffArgs) -> Result<()> {
    let options = RunOptions {
        dry_run: true,
        strict: args.strict,
        yes: false,
    };
    run(ctx, args.config.as_deref(), options)
}

#[derive(Debug, Clone, Copy)]
struct RunOptions {
    dry_run: bool,
    strict: bool,
    yes: bool,
}

fn run(ctx: &Context, config: Option<&Path>, options: RunOptions) -> Result<()> {
    let loaded = LoadedConfig::load(config)?;
    if !ctx.quiet {
        ui::header(if options.dry_run {
            "Configuration Diff"
        } else {
            "Applying Configuration"
        });
        ui::kv("Config", &loaded.path.display().to_string());
        if options.strict {
            ui::kv("Mode", "strict");
        }
    }

    let store = RecordStore::new(paths::record_file()?);
    let session = Session::new(&loaded.desired, &store, loaded.diff_context(options.strict)?);

    let runner = SystemRunner;
    let spinner = progress::spinner("Reading current state...", ctx.quiet);
    let collector = Observing {
        inner: SystemCollector::new(&runner),
        spinner: &spinner,
    };
    let mut executor = SystemExecutor::new(&runner, loaded.base_dir());
    let mut reporter = TerminalProgress::new(ctx.verbose > 0).with_spinner(spinner.clone());

    let outcome = if options.yes {
        session.run(
            &collector,
            &mut executor,
            &mut reporter,
            &mut AutoConfirm,
            options.dry_run,
        )
    } else {
        session.run(
            &collector,
            &mut executor,
            &mut reporter,
            &mut PromptConfirm,
            options.dry_run,
        )
    };
    progress::finish_clear(&spinner);

    match outcome? {
        Outcome::DryRun(_) => {
            println!();
            ui::info("Dry run - no changes made");
            Ok(())
        }
        Outcome::Aborted(_) => {
            println!();
            ui::warn("Aborted");
            Ok(())
        }
        Outcome::Applied { report, .. } => {
            print_summary(&report.summary);
            if report.summary.is_success() {
                Ok(())
            } else {
                bail!(
                    "{} of {} steps failed",
                    report.summary.failed,
                    report.summary.total()
                )
            }
        }
    }
}

/// Collector wrapper that keeps the spinner message current
struct Observing<'a> {
    inner: SystemCollector<'a>,
    spinner: &'a ProgressBar,
}

impl Observing<'_> {
    fn step(&self, message: &'static str) {
        self.spinner.set_message(message);
    }
}

impl Collector for Observing<'_> {
    fn packages(&self) -> Result<BTreeMap<String, String>> {
        self.step("Reading Homebrew formulae...");
        self.inner.packages()
    }

    fn casks(&self) -> Result<BTreeMap<String, String>> {
        self.step("Reading Homebrew casks...");
        self.inner.casks()
    }

    fn apps(&self) -> Result<BTreeMap<u64, String>> {
        self.step("Reading App Store apps...");
        self.inner.apps()
    }

    fn settings(&self, domains: &BTreeSet<String>) -> Result<BTreeMap<SettingKey, Value>> {
        self.step("Reading macOS preferences...");
        self.inner.settings(domains)
    }

    fn git(&self, keys: &[GitKey]) -> Result<BTreeMap<GitKey, String>> {
        self.step("Reading git config...");
        self.inner.git(keys)
    }

    fn files(&self, targets: &[PathBuf]) -> Result<BTreeMap<PathBuf, PathBuf>> {
        self.step("Reading managed files...");
        self.inner.files(targets)
    }

    fn dock_apps(&self) -> Result<Vec<String>> {
        self.step("Reading Dock apps...");
        self.inner.dock_apps()
    }

    fn wallpaper(&self) -> Result<Option<PathBuf>> {
        self.step("Reading wallpaper...");
        self.inner.wallpaper()
    }
}
