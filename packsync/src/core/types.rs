//! Shared deterministic types for reconciliation logic.
//!
//! These types define stable contracts between the planner, executor and
//! reporter. They do not depend on external state or I/O.

use std::collections::BTreeSet;

use thiserror::Error;

/// Opaque project identifier as listed by a remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub id: String,
}

impl ProjectRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Canonical metadata for a resolved project. `slug` is the local key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub id: String,
    pub slug: String,
    pub title: String,
}

/// Why a project id could not be turned into a slug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionReason {
    #[error("project not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A project id that failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resolve {id}: {reason}")]
pub struct ResolutionFailure {
    pub id: String,
    pub reason: ResolutionReason,
}

/// Slugs present in the local mods directory, captured once before planning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledSnapshot {
    slugs: BTreeSet<String>,
}

impl InstalledSnapshot {
    pub fn new<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slugs: slugs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

/// Planned action for one collection entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Install,
    Skip,
    ResolutionFailed(ResolutionReason),
}

impl PlanAction {
    pub fn label(&self) -> &'static str {
        match self {
            PlanAction::Install => "install",
            PlanAction::Skip => "skip",
            PlanAction::ResolutionFailed(_) => "unresolved",
        }
    }
}

/// One line of the install plan, in collection order.
///
/// For unresolved entries `slug` holds the raw project id and `title` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub action: PlanAction,
}

impl PlanEntry {
    pub fn resolved(info: ProjectInfo, action: PlanAction) -> Self {
        Self {
            id: info.id,
            slug: info.slug,
            title: info.title,
            action,
        }
    }

    pub fn unresolved(failure: ResolutionFailure) -> Self {
        Self {
            slug: failure.id.clone(),
            id: failure.id,
            title: String::new(),
            action: PlanAction::ResolutionFailed(failure.reason),
        }
    }
}

/// Terminal outcome of processing one plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    TimedOut,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

/// Which kind of plan entry an [`ExecutionResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Install,
    Skip,
    Unresolved,
}

impl From<&PlanAction> for ActionKind {
    fn from(action: &PlanAction) -> Self {
        match action {
            PlanAction::Install => ActionKind::Install,
            PlanAction::Skip => ActionKind::Skip,
            PlanAction::ResolutionFailed(_) => ActionKind::Unresolved,
        }
    }
}

/// Result of executing one plan entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub slug: String,
    pub action: ActionKind,
    pub outcome: Outcome,
    pub detail: String,
}

/// Aggregate counts for a run.
///
/// `resolved` counts entries that resolved and whose action completed
/// (`installed + skipped`). Everything else lands in `failed`, and
/// `timed_out` is the subset of `failed` killed by the installer timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub resolved: usize,
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub total: usize,
}
