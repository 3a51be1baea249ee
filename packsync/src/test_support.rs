//! Test-only scripted collaborators and fixtures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::core::types::{PlanAction, PlanEntry, ProjectInfo, ProjectRef};
use crate::io::installer::{InstallReport, Installer};
use crate::io::modrinth::{Collection, CollectionSource, LookupError, ProjectLookup};
use crate::io::mods_dir::ModsDir;

/// Build a plan entry whose id and title derive from `slug`.
pub fn plan_entry(slug: &str, action: PlanAction) -> PlanEntry {
    PlanEntry {
        id: format!("{slug}-id"),
        slug: slug.to_string(),
        title: format!("{slug} title"),
        action,
    }
}

/// Collection source returning a fixed list, or an error for unknown ids.
pub struct FixedCollection {
    collection_id: String,
    projects: Vec<String>,
}

impl FixedCollection {
    pub fn new(collection_id: &str, projects: &[&str]) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            projects: projects.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl CollectionSource for FixedCollection {
    fn fetch_collection(&self, collection_id: &str) -> Result<Collection> {
        if collection_id != self.collection_id {
            return Err(anyhow!("collection {collection_id} not found"));
        }
        Ok(Collection {
            name: Some(format!("{collection_id} name")),
            description: None,
            projects: self.projects.iter().map(ProjectRef::new).collect(),
        })
    }
}

/// Project lookup answering from a table. Unknown ids are `NotFound`.
#[derive(Default)]
pub struct ScriptedLookup {
    answers: HashMap<String, Result<ProjectInfo, LookupError>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, id: &str, slug: &str, title: &str) -> Self {
        self.answers.insert(
            id.to_string(),
            Ok(ProjectInfo {
                id: id.to_string(),
                slug: slug.to_string(),
                title: title.to_string(),
            }),
        );
        self
    }

    pub fn with_error(mut self, id: &str, err: LookupError) -> Self {
        self.answers.insert(id.to_string(), Err(err));
        self
    }

    /// Ids looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ProjectLookup for ScriptedLookup {
    fn fetch_project(&self, id: &str) -> Result<ProjectInfo, LookupError> {
        self.calls.borrow_mut().push(id.to_string());
        self.answers
            .get(id)
            .cloned()
            .unwrap_or(Err(LookupError::NotFound))
    }
}

/// Installer returning scripted reports (default: success).
///
/// With [`ScriptedInstaller::writing_markers`], successful installs also
/// create the mod's marker file, mimicking packwiz.
#[derive(Default)]
pub struct ScriptedInstaller {
    reports: HashMap<String, InstallReport>,
    mods_dir: Option<ModsDir>,
    refresh_error: Option<String>,
    installs: RefCell<Vec<String>>,
    refreshes: RefCell<usize>,
}

impl ScriptedInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, slug: &str, report: InstallReport) -> Self {
        self.reports.insert(slug.to_string(), report);
        self
    }

    pub fn writing_markers(mut self, mods_dir: ModsDir) -> Self {
        self.mods_dir = Some(mods_dir);
        self
    }

    pub fn failing_refresh(mut self, message: &str) -> Self {
        self.refresh_error = Some(message.to_string());
        self
    }

    /// Slugs passed to `install`, in call order.
    pub fn installs(&self) -> Vec<String> {
        self.installs.borrow().clone()
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.borrow()
    }
}

impl Installer for ScriptedInstaller {
    fn install(&self, slug: &str) -> InstallReport {
        self.installs.borrow_mut().push(slug.to_string());
        let report = self
            .reports
            .get(slug)
            .cloned()
            .unwrap_or_else(|| InstallReport::success("installed"));
        if report.outcome.is_success()
            && let Some(mods_dir) = &self.mods_dir
        {
            let path = mods_dir.manifest_path(slug);
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(path, format!("name = \"{slug}\"\n"));
        }
        report
    }

    fn refresh(&self) -> Result<()> {
        *self.refreshes.borrow_mut() += 1;
        match &self.refresh_error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// A temporary packwiz pack directory (`pack.toml` + `mods/`).
pub struct TestPack {
    dir: tempfile::TempDir,
}

impl TestPack {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        fs::write(dir.path().join("pack.toml"), "name = \"test pack\"\n")
            .context("write pack.toml")?;
        fs::create_dir_all(dir.path().join("mods")).context("create mods dir")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn mods_dir(&self) -> ModsDir {
        ModsDir::new(self.dir.path().join("mods"), "pw.toml")
    }

    /// Mark `slug` as installed.
    pub fn install_marker(&self, slug: &str) -> Result<PathBuf> {
        let path = self.mods_dir().manifest_path(slug);
        fs::write(&path, format!("name = \"{slug}\"\n"))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Write an executable stand-in for packwiz running `body` under `sh`.
    #[cfg(unix)]
    pub fn fake_installer(&self, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = self.dir.path().join("bin");
        fs::create_dir_all(&bin_dir).context("create bin dir")?;
        let path = bin_dir.join("packwiz");
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        let mut perms = fs::metadata(&path).context("stat installer")?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).context("chmod installer")?;
        Ok(path)
    }
}
