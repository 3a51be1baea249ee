//! Human-readable rendering of plans, results and summaries.
//!
//! Everything here returns strings; callers decide where they go.

use crate::core::types::{ExecutionResult, Outcome, PlanAction, PlanEntry, RunSummary};

const RULE: &str = "==================================================";

/// One line per plan entry: `[ 2/10] skip       beta (Beta)`.
pub fn plan_line(index: usize, total: usize, entry: &PlanEntry) -> String {
    let width = total.to_string().len();
    let position = format!("[{:>width$}/{total}]", index + 1);
    match &entry.action {
        PlanAction::ResolutionFailed(reason) => {
            format!("{position} {:<10} {}: {reason}", entry.action.label(), entry.slug)
        }
        action => format!(
            "{position} {:<10} {} ({})",
            action.label(),
            entry.slug,
            entry.title
        ),
    }
}

/// One line per execution result.
pub fn result_line(result: &ExecutionResult) -> String {
    match result.outcome {
        Outcome::Success => format!("  ok      {} - {}", result.slug, result.detail),
        Outcome::Failure => format!("  failed  {} - {}", result.slug, result.detail),
        Outcome::TimedOut => format!("  timeout {} - {}", result.slug, result.detail),
    }
}

/// Final summary block printed after a sync.
pub fn summary_block(heading: &str, summary: &RunSummary) -> String {
    let mut buf = String::new();
    buf.push_str(RULE);
    buf.push('\n');
    buf.push_str(heading);
    buf.push('\n');
    buf.push_str(&format!("  Installed: {}\n", summary.installed));
    buf.push_str(&format!(
        "  Skipped (already installed): {}\n",
        summary.skipped
    ));
    if summary.timed_out > 0 {
        buf.push_str(&format!(
            "  Failed: {} ({} timed out)\n",
            summary.failed, summary.timed_out
        ));
    } else {
        buf.push_str(&format!("  Failed: {}\n", summary.failed));
    }
    buf.push_str(&format!("  Total: {}\n", summary.total));
    buf
}

/// Markdown slug list: header comments then one slug per line, sorted.
/// Unresolved entries are left out.
pub fn render_slug_list(collection_id: &str, entries: &[PlanEntry]) -> String {
    let mut slugs: Vec<&str> = entries
        .iter()
        .filter(|entry| !matches!(entry.action, PlanAction::ResolutionFailed(_)))
        .map(|entry| entry.slug.as_str())
        .collect();
    slugs.sort_unstable();

    let mut buf = String::new();
    buf.push_str("# Modrinth Collection Mods\n");
    buf.push_str(&format!("# Collection ID: {collection_id}\n"));
    buf.push_str(&format!("# Total mods: {}\n\n", slugs.len()));
    for slug in slugs {
        buf.push_str(slug);
        buf.push('\n');
    }
    buf
}

/// Ids that failed to resolve, in plan order.
pub fn unresolved_ids(entries: &[PlanEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|entry| matches!(entry.action, PlanAction::ResolutionFailed(_)))
        .map(|entry| entry.id.as_str())
        .collect()
}
