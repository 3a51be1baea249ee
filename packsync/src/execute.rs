//! Sequential execution of an install plan.

use std::thread;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::cancel::CancelFlag;
use crate::core::types::{ActionKind, ExecutionResult, Outcome, PlanAction, PlanEntry};
use crate::io::installer::Installer;

/// Knobs for [`execute`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Pause after each installer call before touching the next entry.
    pub inter_call_delay: Duration,
    pub cancel: CancelFlag,
}

/// Results in plan order. `aborted` is set when cancellation stopped the run
/// before every entry was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRun {
    pub results: Vec<ExecutionResult>,
    pub aborted: bool,
}

/// Execute `entries` one at a time.
///
/// Only `Install` entries reach the installer, exactly once each. `Skip`
/// entries become a synthetic success and unresolved entries a synthetic
/// failure. `on_result` sees every result as soon as it exists.
#[instrument(skip_all, fields(entries = entries.len()))]
pub fn execute<I, F>(
    entries: &[PlanEntry],
    installer: &I,
    options: &ExecuteOptions,
    mut on_result: F,
) -> ExecutionRun
where
    I: Installer + ?Sized,
    F: FnMut(&ExecutionResult),
{
    let mut results = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if options.cancel.is_cancelled() {
            warn!(
                processed = index,
                remaining = entries.len() - index,
                "execution cancelled"
            );
            return ExecutionRun {
                results,
                aborted: true,
            };
        }

        let result = execute_entry(entry, installer);
        on_result(&result);
        let called_installer = result.action == ActionKind::Install;
        results.push(result);

        if called_installer && index + 1 < entries.len() && !options.inter_call_delay.is_zero() {
            thread::sleep(options.inter_call_delay);
        }
    }
    info!(results = results.len(), "execution finished");
    ExecutionRun {
        results,
        aborted: false,
    }
}

fn execute_entry<I: Installer + ?Sized>(entry: &PlanEntry, installer: &I) -> ExecutionResult {
    let (outcome, detail) = match &entry.action {
        PlanAction::Install => {
            let report = installer.install(&entry.slug);
            (report.outcome, report.detail)
        }
        PlanAction::Skip => (Outcome::Success, "already installed".to_string()),
        PlanAction::ResolutionFailed(reason) => (Outcome::Failure, reason.to_string()),
    };
    ExecutionResult {
        slug: entry.slug.clone(),
        action: ActionKind::from(&entry.action),
        outcome,
        detail,
    }
}
