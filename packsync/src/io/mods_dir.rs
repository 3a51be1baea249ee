//! Read-only view of the pack's per-mod manifest directory.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::InstalledSnapshot;

/// Location of per-mod marker files: `<dir>/<slug>.<extension>`.
#[derive(Debug, Clone)]
pub struct ModsDir {
    dir: PathBuf,
    extension: String,
}

impl ModsDir {
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.to_string(),
        }
    }

    pub fn manifest_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}.{}", self.extension))
    }

    /// Collect every slug with a marker file. A missing directory is an
    /// empty snapshot.
    pub fn snapshot(&self) -> Result<InstalledSnapshot> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "mods dir missing, empty snapshot");
                return Ok(InstalledSnapshot::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", self.dir.display()));
            }
        };

        let suffix = format!(".{}", self.extension);
        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry.context("read entry")?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(slug) = name.to_str().and_then(|name| name.strip_suffix(&suffix))
                && !slug.is_empty()
            {
                slugs.push(slug.to_string());
            }
        }
        debug!(dir = %self.dir.display(), installed = slugs.len(), "snapshot taken");
        Ok(InstalledSnapshot::new(slugs))
    }
}
