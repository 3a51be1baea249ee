//! Deterministic classification of collection entries into an install plan.

use std::ops::ControlFlow;

use crate::core::types::{
    InstalledSnapshot, PlanAction, PlanEntry, ProjectInfo, ProjectRef, ResolutionFailure,
};

/// Plan produced by [`plan_with`]. `cancelled` is set when the `before`
/// hook stopped planning early, in which case `entries` covers a prefix of
/// the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutput {
    pub entries: Vec<PlanEntry>,
    pub cancelled: bool,
}

/// Classify every ref against a fixed snapshot of installed slugs.
///
/// - Output has one entry per input ref, in input order.
/// - Duplicate refs are classified independently (no dedup).
/// - A failed resolution yields `ResolutionFailed` and planning continues.
pub fn plan<R>(refs: &[ProjectRef], resolve: R, snapshot: &InstalledSnapshot) -> Vec<PlanEntry>
where
    R: FnMut(&ProjectRef) -> Result<ProjectInfo, ResolutionFailure>,
{
    plan_with(refs, resolve, snapshot, |_| ControlFlow::Continue(())).entries
}

/// Like [`plan`], but calls `before(index)` ahead of resolving each ref,
/// the first one included. Returning `Break` stops planning without
/// resolving that ref.
pub fn plan_with<R, B>(
    refs: &[ProjectRef],
    mut resolve: R,
    snapshot: &InstalledSnapshot,
    mut before: B,
) -> PlanOutput
where
    R: FnMut(&ProjectRef) -> Result<ProjectInfo, ResolutionFailure>,
    B: FnMut(usize) -> ControlFlow<()>,
{
    let mut entries = Vec::with_capacity(refs.len());
    for (index, project) in refs.iter().enumerate() {
        if before(index).is_break() {
            return PlanOutput {
                entries,
                cancelled: true,
            };
        }
        entries.push(classify(resolve(project), snapshot));
    }
    PlanOutput {
        entries,
        cancelled: false,
    }
}

fn classify(
    resolved: Result<ProjectInfo, ResolutionFailure>,
    snapshot: &InstalledSnapshot,
) -> PlanEntry {
    match resolved {
        Ok(info) => {
            let action = if snapshot.contains(&info.slug) {
                PlanAction::Skip
            } else {
                PlanAction::Install
            };
            PlanEntry::resolved(info, action)
        }
        Err(failure) => PlanEntry::unresolved(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResolutionReason;

    fn refs(ids: &[&str]) -> Vec<ProjectRef> {
        ids.iter().map(|id| ProjectRef::new(*id)).collect()
    }

    fn table(id: &ProjectRef) -> Result<ProjectInfo, ResolutionFailure> {
        let slug = match id.id.as_str() {
            "a1" => "alpha",
            "a2" => "beta",
            "a3" => "gamma",
            _ => {
                return Err(ResolutionFailure {
                    id: id.id.clone(),
                    reason: ResolutionReason::NotFound,
                });
            }
        };
        Ok(ProjectInfo {
            id: id.id.clone(),
            slug: slug.to_string(),
            title: format!("{slug} title"),
        })
    }

    fn actions(entries: &[PlanEntry]) -> Vec<(&str, &PlanAction)> {
        entries
            .iter()
            .map(|entry| (entry.slug.as_str(), &entry.action))
            .collect()
    }

    #[test]
    fn classifies_against_snapshot_in_input_order() {
        let snapshot = InstalledSnapshot::new(["beta"]);
        let entries = plan(&refs(&["a1", "a2", "a3"]), table, &snapshot);
        assert_eq!(
            actions(&entries),
            vec![
                ("alpha", &PlanAction::Install),
                ("beta", &PlanAction::Skip),
                ("gamma", &PlanAction::Install),
            ]
        );
    }

    #[test]
    fn unresolved_id_becomes_failed_entry() {
        let entries = plan(&refs(&["bad-id"]), table, &InstalledSnapshot::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].slug, "bad-id");
        assert_eq!(entries[0].title, "");
        assert_eq!(
            entries[0].action,
            PlanAction::ResolutionFailed(ResolutionReason::NotFound)
        );
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let entries = plan(
            &refs(&["a1", "nope", "a2", "a3"]),
            table,
            &InstalledSnapshot::default(),
        );
        assert_eq!(entries.len(), 4);
        assert!(matches!(
            entries[1].action,
            PlanAction::ResolutionFailed(_)
        ));
        assert_eq!(
            entries
                .iter()
                .filter(|entry| entry.action == PlanAction::Install)
                .count(),
            3
        );
    }

    #[test]
    fn duplicates_are_kept_and_classified_independently() {
        let snapshot = InstalledSnapshot::new(["alpha"]);
        let entries = plan(&refs(&["a1", "a2", "a1", "a2"]), table, &snapshot);
        assert_eq!(
            actions(&entries),
            vec![
                ("alpha", &PlanAction::Skip),
                ("beta", &PlanAction::Install),
                ("alpha", &PlanAction::Skip),
                ("beta", &PlanAction::Install),
            ]
        );
    }

    #[test]
    fn planning_twice_is_identical() {
        let input = refs(&["a3", "bad", "a1", "a2"]);
        let snapshot = InstalledSnapshot::new(["gamma"]);
        assert_eq!(plan(&input, table, &snapshot), plan(&input, table, &snapshot));
    }

    #[test]
    fn empty_input_yields_empty_plan() {
        assert!(plan(&[], table, &InstalledSnapshot::default()).is_empty());
    }

    #[test]
    fn before_runs_ahead_of_every_ref() {
        let mut seen = Vec::new();
        let output = plan_with(
            &refs(&["a1", "a2", "a3"]),
            table,
            &InstalledSnapshot::default(),
            |index| {
                seen.push(index);
                ControlFlow::Continue(())
            },
        );
        assert!(!output.cancelled);
        assert_eq!(output.entries.len(), 3);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn before_break_returns_prefix() {
        let mut calls = 0;
        let output = plan_with(
            &refs(&["a1", "a2", "a3"]),
            |project| {
                calls += 1;
                table(project)
            },
            &InstalledSnapshot::default(),
            |index| {
                if index == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );
        assert!(output.cancelled);
        assert_eq!(output.entries.len(), 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn break_at_first_ref_resolves_nothing() {
        let mut calls = 0;
        let output = plan_with(
            &refs(&["a1", "a2"]),
            |project| {
                calls += 1;
                table(project)
            },
            &InstalledSnapshot::default(),
            |_| ControlFlow::Break(()),
        );
        assert!(output.cancelled);
        assert!(output.entries.is_empty());
        assert_eq!(calls, 0);
    }
}
