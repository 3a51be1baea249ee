//! Installer abstraction over the packwiz CLI.
//!
//! The [`Installer`] trait decouples execution from the packwiz binary. Tests
//! use scripted installers that return predetermined outcomes without spawning
//! processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::types::Outcome;
use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Bytes of stderr kept in a failure detail line.
const DETAIL_TAIL_BYTES: usize = 400;

/// Outcome of one installer invocation plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub outcome: Outcome,
    pub detail: String,
}

impl InstallReport {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            detail: detail.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            detail: detail.into(),
        }
    }

    pub fn timed_out(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::TimedOut,
            detail: detail.into(),
        }
    }
}

/// Something that can add a mod to the local pack by slug.
pub trait Installer {
    /// Install one mod. Never errors: every failure mode is an [`Outcome`].
    fn install(&self, slug: &str) -> InstallReport;

    /// Rebuild the pack index after a run.
    fn refresh(&self) -> Result<()>;
}

/// Installer that spawns `packwiz modrinth install <slug> --yes`.
pub struct PackwizInstaller {
    binary: PathBuf,
    pack_dir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl PackwizInstaller {
    pub fn new(
        binary: impl Into<PathBuf>,
        pack_dir: impl Into<PathBuf>,
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            binary: binary.into(),
            pack_dir: pack_dir.into(),
            timeout,
            output_limit_bytes,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.pack_dir);
        cmd
    }
}

impl Installer for PackwizInstaller {
    #[instrument(skip(self), fields(timeout_secs = self.timeout.as_secs()))]
    fn install(&self, slug: &str) -> InstallReport {
        let mut cmd = self.command();
        cmd.arg("modrinth").arg("install").arg(slug).arg("--yes");

        let output = match run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "packwiz could not be run");
                return InstallReport::failure(format!("{err:#}"));
            }
        };
        let report = report_from_output(&output, self.timeout);
        debug!(outcome = ?report.outcome, "packwiz install finished");
        report
    }

    #[instrument(skip(self))]
    fn refresh(&self) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("refresh");
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;
        if output.timed_out {
            return Err(anyhow!("packwiz refresh timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "packwiz refresh failed with status {:?}: {}",
                output.status.code(),
                stderr_tail(&output)
            ));
        }
        info!("pack index refreshed");
        Ok(())
    }
}

fn report_from_output(output: &CommandOutput, timeout: Duration) -> InstallReport {
    if output.timed_out {
        return InstallReport::timed_out(format!("timed out after {}s", timeout.as_secs()));
    }
    if output.status.success() {
        return InstallReport::success("installed");
    }
    let tail = stderr_tail(output);
    let code = output
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |code| code.to_string());
    if tail.is_empty() {
        InstallReport::failure(format!("exit {code}"))
    } else {
        InstallReport::failure(format!("exit {code}: {tail}"))
    }
}

/// Last non-empty stderr (or stdout) text, trimmed and bounded.
fn stderr_tail(output: &CommandOutput) -> String {
    let mut text = output.stderr_lossy().trim().to_string();
    if text.is_empty() {
        text = output.stdout_lossy().trim().to_string();
    }
    let text = text.replace('\n', " | ");
    if text.len() <= DETAIL_TAIL_BYTES {
        return text;
    }
    let mut start = text.len() - DETAIL_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
