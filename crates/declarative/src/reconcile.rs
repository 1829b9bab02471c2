//! Run pipeline: collect, diff, confirm, apply, record

use crate::context::{Collector, ConfirmCallback, Executor, ProgressCallback, collect_observed};
use crate::desired::DesiredConfig;
use crate::diff::{DiffContext, compute_diff};
use crate::executor::Orchestrator;
use crate::record::RecordStore;
use crate::types::{ApplyReport, Diff};
use anyhow::Result;

/// How a run ended
#[derive(Debug)]
pub enum Outcome {
    /// Diff computed and shown, nothing executed
    DryRun(Diff),
    /// User declined the confirmation prompt
    Aborted(Diff),
    /// Orchestrator ran and the record was replaced
    Applied { diff: Diff, report: ApplyReport },
}

impl Outcome {
    pub fn diff(&self) -> &Diff {
        match self {
            Self::DryRun(diff) | Self::Aborted(diff) | Self::Applied { diff, .. } => diff,
        }
    }

    /// Whether the run finished without failed entries.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Applied { report, .. } => report.summary.is_success(),
            Self::DryRun(_) | Self::Aborted(_) => true,
        }
    }
}

/// One reconciliation of a loaded configuration against the machine.
pub struct Session<'a> {
    pub desired: &'a DesiredConfig,
    pub store: &'a RecordStore,
    pub ctx: DiffContext,
}

impl<'a> Session<'a> {
    pub fn new(desired: &'a DesiredConfig, store: &'a RecordStore, ctx: DiffContext) -> Self {
        Self {
            desired,
            store,
            ctx,
        }
    }

    /// Collect observed state, load the record and compute the diff.
    pub fn plan(&self, collector: &dyn Collector) -> Diff {
        let record = self.store.load();
        let observed = collect_observed(collector, self.desired, &record, &self.ctx);
        compute_diff(self.desired, &observed, &record, &self.ctx)
    }

    /// Full run. With `dry_run` the diff is reported and nothing else
    /// happens; the record is left untouched.
    pub fn run<E, P, C>(
        &self,
        collector: &dyn Collector,
        executor: &mut E,
        progress: &mut P,
        confirm: &mut C,
        dry_run: bool,
    ) -> Result<Outcome>
    where
        E: Executor,
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        let diff = self.plan(collector);
        progress.on_diff(&diff);

        if dry_run {
            return Ok(Outcome::DryRun(diff));
        }

        if diff.has_changes() && !confirm.confirm("Apply changes?")? {
            return Ok(Outcome::Aborted(diff));
        }

        let report = self.apply(&diff, executor, progress);
        Ok(Outcome::Applied { diff, report })
    }

    /// Execute `diff` and replace the record with the desired settings.
    ///
    /// The record is written even when entries failed: the declared intent
    /// did not change.
    pub fn apply<E, P>(&self, diff: &Diff, executor: &mut E, progress: &mut P) -> ApplyReport
    where
        E: Executor,
        P: ProgressCallback,
    {
        let report = Orchestrator::new().apply(diff, executor, progress);
        if let Err(e) = self.store.replace_with(self.desired) {
            log::warn!("{e}");
        }
        report
    }
}
