//! Orchestration for `packsync plan` and `packsync sync`.
//!
//! Fetches the collection, snapshots installed mods, plans, and (for sync)
//! executes the plan and refreshes the pack index.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cancel::CancelFlag;
use crate::core::planner::plan_with;
use crate::core::reporter::summarize;
use crate::core::types::{ExecutionResult, PlanEntry, RunSummary};
use crate::execute::{ExecuteOptions, ExecutionRun, execute};
use crate::io::config::SyncConfig;
use crate::io::installer::Installer;
use crate::io::modrinth::{CollectionSource, ProjectLookup};
use crate::io::mods_dir::ModsDir;
use crate::resolve::resolve;

/// Fatal setup problems, detected before any network call.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error(
        "{} not found. Run packsync from your packwiz modpack directory or pass --pack-dir.",
        .path.display()
    )]
    MissingPackManifest { path: PathBuf },
    #[error(
        "packwiz not found at {}. Install packwiz or set installer_path in packsync.toml.",
        .path.display()
    )]
    MissingInstaller { path: PathBuf },
}

/// Require the pack manifest to exist under `pack_dir`.
pub fn check_pack_manifest(pack_dir: &Path, cfg: &SyncConfig) -> Result<(), PreconditionError> {
    let path = pack_dir.join(&cfg.pack_manifest);
    if !path.is_file() {
        return Err(PreconditionError::MissingPackManifest { path });
    }
    Ok(())
}

/// Require the installer binary to exist.
pub fn check_installer(binary: &Path) -> Result<(), PreconditionError> {
    if !binary.is_file() {
        return Err(PreconditionError::MissingInstaller {
            path: binary.to_path_buf(),
        });
    }
    Ok(())
}

/// Inputs shared by planning and syncing.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub collection_id: String,
    pub mods: ModsDir,
    pub inter_call_delay: Duration,
    pub cancel: CancelFlag,
}

impl SyncRequest {
    pub fn from_config(pack_dir: &Path, cfg: &SyncConfig, cancel: CancelFlag) -> Self {
        Self {
            collection_id: cfg.collection_id.clone(),
            mods: ModsDir::new(pack_dir.join(&cfg.mods_dir), &cfg.manifest_extension),
            inter_call_delay: cfg.inter_call_delay(),
            cancel,
        }
    }
}

/// A plan for one collection.
#[derive(Debug, Clone)]
pub struct PlanRun {
    pub collection_name: Option<String>,
    /// Number of ids listed by the collection.
    pub listed: usize,
    pub entries: Vec<PlanEntry>,
    /// Planning stopped early; `entries` covers a prefix of the collection.
    pub cancelled: bool,
}

/// Result of a full sync.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub plan: PlanRun,
    pub execution: ExecutionRun,
    pub summary: RunSummary,
    /// Whether the post-run index refresh succeeded. `None` when it was not
    /// attempted.
    pub refreshed: Option<bool>,
}

impl SyncOutcome {
    pub fn aborted(&self) -> bool {
        self.plan.cancelled || self.execution.aborted
    }
}

/// Fetch the collection, snapshot installed mods and classify every entry.
#[instrument(skip_all, fields(collection_id = %request.collection_id))]
pub fn build_plan<C, L>(source: &C, lookup: &L, request: &SyncRequest) -> Result<PlanRun>
where
    C: CollectionSource + ?Sized,
    L: ProjectLookup + ?Sized,
{
    let collection = source
        .fetch_collection(&request.collection_id)
        .with_context(|| format!("fetch collection {}", request.collection_id))?;
    info!(
        name = collection.name.as_deref().unwrap_or("<unnamed>"),
        description = collection.description.as_deref().unwrap_or(""),
        projects = collection.projects.len(),
        "collection fetched"
    );
    if collection.projects.is_empty() {
        warn!("collection lists no projects");
    }

    let snapshot = request
        .mods
        .snapshot()
        .context("snapshot installed mods")?;
    info!(installed = snapshot.len(), "installed snapshot taken");

    let output = plan_with(
        &collection.projects,
        |project| resolve(lookup, project),
        &snapshot,
        |index| pause_or_stop(index, request),
    );

    Ok(PlanRun {
        collection_name: collection.name,
        listed: collection.projects.len(),
        entries: output.entries,
        cancelled: output.cancelled,
    })
}

/// Plan, execute, refresh, summarize.
///
/// `on_plan` sees the finished plan before anything is installed and
/// `on_result` sees each execution result as it lands. Per-entry failures
/// never make this return `Err`; only collection fetch and local filesystem
/// errors do.
#[instrument(skip_all, fields(collection_id = %request.collection_id))]
pub fn run_sync<C, L, I, P, F>(
    source: &C,
    lookup: &L,
    installer: &I,
    request: &SyncRequest,
    on_plan: P,
    on_result: F,
) -> Result<SyncOutcome>
where
    C: CollectionSource + ?Sized,
    L: ProjectLookup + ?Sized,
    I: Installer + ?Sized,
    P: FnOnce(&PlanRun),
    F: FnMut(&ExecutionResult),
{
    let plan = build_plan(source, lookup, request)?;
    on_plan(&plan);
    if plan.cancelled {
        warn!("planning cancelled, nothing executed");
        return Ok(SyncOutcome {
            plan,
            execution: ExecutionRun {
                results: Vec::new(),
                aborted: true,
            },
            summary: RunSummary::default(),
            refreshed: None,
        });
    }

    let options = ExecuteOptions {
        inter_call_delay: request.inter_call_delay,
        cancel: request.cancel.clone(),
    };
    let execution = execute(&plan.entries, installer, &options, on_result);
    let summary = summarize(&execution.results);

    let refreshed = match installer.refresh() {
        Ok(()) => true,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "index refresh failed");
            false
        }
    };

    Ok(SyncOutcome {
        plan,
        execution,
        summary,
        refreshed: Some(refreshed),
    })
}

/// Cancellation check ahead of each lookup, with the politeness delay only
/// between lookups.
fn pause_or_stop(index: usize, request: &SyncRequest) -> ControlFlow<()> {
    if request.cancel.is_cancelled() {
        return ControlFlow::Break(());
    }
    if index > 0 && !request.inter_call_delay.is_zero() {
        thread::sleep(request.inter_call_delay);
    }
    if request.cancel.is_cancelled() {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Outcome, PlanAction, ResolutionReason};
    use crate::io::installer::InstallReport;
    use crate::test_support::{FixedCollection, ScriptedInstaller, ScriptedLookup, TestPack};

    fn lookup() -> ScriptedLookup {
        ScriptedLookup::new()
            .with_project("a1", "alpha", "Alpha")
            .with_project("a2", "beta", "Beta")
            .with_project("a3", "gamma", "Gamma")
    }

    fn request(pack: &TestPack) -> SyncRequest {
        SyncRequest {
            collection_id: "COLL".to_string(),
            mods: pack.mods_dir(),
            inter_call_delay: Duration::ZERO,
            cancel: CancelFlag::new(),
        }
    }

    #[test]
    fn missing_pack_manifest_is_precondition_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = check_pack_manifest(temp.path(), &SyncConfig::default()).unwrap_err();
        assert!(matches!(err, PreconditionError::MissingPackManifest { .. }));
        assert!(err.to_string().contains("--pack-dir"));
    }

    #[test]
    fn missing_installer_is_precondition_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = check_installer(&temp.path().join("packwiz")).unwrap_err();
        assert!(matches!(err, PreconditionError::MissingInstaller { .. }));
    }

    #[test]
    fn plan_skips_installed_and_keeps_order() {
        let pack = TestPack::new().expect("pack");
        pack.install_marker("beta").expect("marker");
        let source = FixedCollection::new("COLL", &["a1", "a2", "a3"]);

        let plan = build_plan(&source, &lookup(), &request(&pack)).expect("plan");

        assert_eq!(plan.listed, 3);
        assert!(!plan.cancelled);
        let actions: Vec<(&str, &PlanAction)> = plan
            .entries
            .iter()
            .map(|e| (e.slug.as_str(), &e.action))
            .collect();
        assert_eq!(
            actions,
            vec![
                ("alpha", &PlanAction::Install),
                ("beta", &PlanAction::Skip),
                ("gamma", &PlanAction::Install),
            ]
        );
    }

    #[test]
    fn unknown_collection_is_fatal() {
        let pack = TestPack::new().expect("pack");
        let source = FixedCollection::new("OTHER", &["a1"]);
        let err = build_plan(&source, &lookup(), &request(&pack)).unwrap_err();
        assert!(format!("{err:#}").contains("fetch collection COLL"));
    }

    #[test]
    fn sync_installs_missing_and_refreshes() {
        let pack = TestPack::new().expect("pack");
        pack.install_marker("beta").expect("marker");
        let source = FixedCollection::new("COLL", &["a1", "a2", "a3"]);
        let installer = ScriptedInstaller::new();

        let outcome = run_sync(
            &source,
            &lookup(),
            &installer,
            &request(&pack),
            |_| {},
            |_| {},
        )
        .expect("sync");

        assert_eq!(installer.installs(), vec!["alpha", "gamma"]);
        assert_eq!(installer.refreshes(), 1);
        assert_eq!(outcome.refreshed, Some(true));
        assert_eq!(
            outcome.summary,
            RunSummary {
                resolved: 3,
                installed: 2,
                skipped: 1,
                failed: 0,
                timed_out: 0,
                total: 3,
            }
        );
    }

    #[test]
    fn unresolved_id_is_reported_not_fatal() {
        let pack = TestPack::new().expect("pack");
        let source = FixedCollection::new("COLL", &["bad-id"]);
        let installer = ScriptedInstaller::new();

        let outcome = run_sync(
            &source,
            &lookup(),
            &installer,
            &request(&pack),
            |_| {},
            |_| {},
        )
        .expect("sync");

        assert_eq!(
            outcome.plan.entries[0].action,
            PlanAction::ResolutionFailed(ResolutionReason::NotFound)
        );
        assert_eq!(outcome.summary.resolved, 0);
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.summary.total, 1);
        assert!(installer.installs().is_empty());
    }

    #[test]
    fn refresh_failure_does_not_fail_the_run() {
        let pack = TestPack::new().expect("pack");
        let source = FixedCollection::new("COLL", &["a1"]);
        let installer = ScriptedInstaller::new().failing_refresh("index locked");

        let outcome = run_sync(
            &source,
            &lookup(),
            &installer,
            &request(&pack),
            |_| {},
            |_| {},
        )
        .expect("sync");

        assert_eq!(outcome.refreshed, Some(false));
        assert_eq!(outcome.summary.installed, 1);
    }

    #[test]
    fn timed_out_install_counts_as_failed() {
        let pack = TestPack::new().expect("pack");
        let source = FixedCollection::new("COLL", &["a1"]);
        let installer = ScriptedInstaller::new()
            .with_report("alpha", InstallReport::timed_out("timed out after 30s"));

        let outcome = run_sync(
            &source,
            &lookup(),
            &installer,
            &request(&pack),
            |_| {},
            |_| {},
        )
        .expect("sync");

        assert_eq!(outcome.execution.results[0].outcome, Outcome::TimedOut);
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.summary.timed_out, 1);
        assert!(!outcome.aborted());
    }

    #[test]
    fn cancelled_before_planning_executes_nothing() {
        let pack = TestPack::new().expect("pack");
        let source = FixedCollection::new("COLL", &["a1", "a2"]);
        let installer = ScriptedInstaller::new();
        let req = request(&pack);
        req.cancel.cancel();
        let lookup = lookup();

        let outcome =
            run_sync(&source, &lookup, &installer, &req, |_| {}, |_| {}).expect("sync");

        assert!(outcome.aborted());
        assert!(outcome.plan.entries.is_empty());
        assert!(lookup.calls().is_empty());
        assert!(installer.installs().is_empty());
        assert_eq!(outcome.refreshed, None);
    }
}
