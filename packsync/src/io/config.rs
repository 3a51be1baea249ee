//! Sync configuration stored in `packsync.toml` next to `pack.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "packsync.toml";

/// Sync configuration (TOML).
///
/// Every field is optional in the file; missing fields fall back to the
/// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Modrinth collection to reconcile against.
    pub collection_id: String,

    /// Base URL of the Modrinth API (no trailing slash).
    pub api_base: String,

    /// `User-Agent` header sent with every API request.
    pub user_agent: String,

    /// Directory (relative to the pack dir) holding per-mod manifests.
    pub mods_dir: PathBuf,

    /// Extension of a per-mod manifest, without the leading dot.
    pub manifest_extension: String,

    /// Pack manifest that must exist for the pack dir to be valid.
    pub pack_manifest: PathBuf,

    /// Path to the packwiz binary. A leading `~/` expands to the home dir.
    pub installer_path: String,

    /// Per-call timeout for API requests and installer runs.
    pub call_timeout_secs: u64,

    /// Politeness delay between successive remote or installer calls.
    pub inter_call_delay_ms: u64,

    /// Truncate captured installer stdout/stderr beyond this many bytes.
    pub installer_output_limit_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection_id: "Fcn87KFP".to_string(),
            api_base: "https://api.modrinth.com".to_string(),
            user_agent: concat!("packsync/", env!("CARGO_PKG_VERSION")).to_string(),
            mods_dir: PathBuf::from("mods"),
            manifest_extension: "pw.toml".to_string(),
            pack_manifest: PathBuf::from("pack.toml"),
            installer_path: "~/go/bin/packwiz".to_string(),
            call_timeout_secs: 30,
            inter_call_delay_ms: 100,
            installer_output_limit_bytes: 100_000,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collection_id.trim().is_empty() {
            return Err(anyhow!("collection_id must be non-empty"));
        }
        if self.api_base.trim().is_empty() {
            return Err(anyhow!("api_base must be non-empty"));
        }
        if self.manifest_extension.trim().is_empty() || self.manifest_extension.starts_with('.')
        {
            return Err(anyhow!(
                "manifest_extension must be non-empty and must not start with '.'"
            ));
        }
        if self.installer_path.trim().is_empty() {
            return Err(anyhow!("installer_path must be non-empty"));
        }
        if self.call_timeout_secs == 0 {
            return Err(anyhow!("call_timeout_secs must be > 0"));
        }
        if self.installer_output_limit_bytes == 0 {
            return Err(anyhow!("installer_output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }

    /// Installer binary path with `~/` expanded.
    pub fn installer_binary(&self) -> PathBuf {
        expand_home(&self.installer_path)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SyncConfig::default()`.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        let cfg = SyncConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SyncConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SyncConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
