//! Pure aggregation of plan entries and execution results into counts.

use crate::core::types::{ActionKind, ExecutionResult, Outcome, PlanAction, PlanEntry, RunSummary};

/// Fold execution results into a [`RunSummary`].
pub fn summarize(results: &[ExecutionResult]) -> RunSummary {
    let mut summary = RunSummary {
        total: results.len(),
        ..RunSummary::default()
    };
    for result in results {
        match (result.action, result.outcome) {
            (ActionKind::Install, Outcome::Success) => summary.installed += 1,
            (ActionKind::Skip, Outcome::Success) => summary.skipped += 1,
            (_, Outcome::TimedOut) => {
                summary.timed_out += 1;
                summary.failed += 1;
            }
            _ => summary.failed += 1,
        }
    }
    summary.resolved = summary.installed + summary.skipped;
    summary
}

/// Would-be counts for a dry run: planned installs count as installed.
pub fn summarize_plan(entries: &[PlanEntry]) -> RunSummary {
    let mut summary = RunSummary {
        total: entries.len(),
        ..RunSummary::default()
    };
    for entry in entries {
        match entry.action {
            PlanAction::Install => summary.installed += 1,
            PlanAction::Skip => summary.skipped += 1,
            PlanAction::ResolutionFailed(_) => summary.failed += 1,
        }
    }
    summary.resolved = summary.installed + summary.skipped;
    summary
}
