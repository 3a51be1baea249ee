//! Run child processes with a hard wall-clock timeout and bounded output.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

/// How long the output readers may keep draining after the child is gone.
///
/// A descendant that outlives the child can hold the pipes open forever; once
/// this grace period passes its readers are detached and whatever they were
/// still holding is dropped.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

type Captured = Result<(Vec<u8>, usize)>;

impl CommandOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Run `cmd` with stdin closed, killing it once `timeout` elapses.
///
/// stdout/stderr are drained on reader threads so a chatty child cannot block
/// on a full pipe. At most `output_limit_bytes` of each stream are kept; the
/// rest is counted in `*_truncated` and discarded.
///
/// On unix the child leads its own process group and a timeout kills the
/// whole group, so wrapper scripts and their helpers die with it. Output
/// collection is bounded by [`DRAIN_GRACE`] either way, which keeps the call
/// within `timeout` plus the grace period.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_rx = spawn_reader(stdout, output_limit_bytes);
    let stderr_rx = spawn_reader(stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            kill_process_group(&mut child).context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let drain_deadline = Instant::now() + DRAIN_GRACE;
    let (stdout, stdout_truncated) =
        collect_output(&stdout_rx, drain_deadline, "stdout").context("join stdout")?;
    let (stderr, stderr_truncated) =
        collect_output(&stderr_rx, drain_deadline, "stderr").context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// Kill the child's process group, falling back to the child alone.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let group = format!("-{}", child.id());
    let killed = Command::new("kill")
        .args(["-s", "KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match killed {
        Ok(status) if status.success() => Ok(()),
        other => {
            debug!(?other, "group kill failed, killing child only");
            child.kill()
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

fn spawn_reader<R: Read + Send + 'static>(reader: R, limit: usize) -> Receiver<Captured> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone once the drain deadline passed.
        let _ = tx.send(read_stream_limited(reader, limit));
    });
    rx
}

fn collect_output(rx: &Receiver<Captured>, deadline: Instant, stream: &str) -> Captured {
    let wait = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(wait) {
        Ok(captured) => captured,
        Err(RecvTimeoutError::Timeout) => {
            warn!(stream, "output still open after child exit, detaching reader");
            Ok((Vec::new(), 0))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Captured {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_exit_code_and_streams() {
        let output = run_command_with_timeout(
            sh("echo out; echo err >&2; exit 3"),
            Duration::from_secs(10),
            1000,
        )
        .expect("run");
        assert!(!output.timed_out);
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout_lossy(), "out\n");
        assert_eq!(output.stderr_lossy(), "err\n");
    }

    #[test]
    fn kills_process_after_timeout() {
        let output = run_command_with_timeout(
            sh("exec sleep 5"),
            Duration::from_millis(200),
            1000,
        )
        .expect("run");
        assert!(output.timed_out);
        assert!(!output.status.success());
    }

    #[test]
    fn timeout_kills_children_of_a_wrapper_script() {
        // `sleep` runs as a child of the shell, not in its place, and keeps
        // the output pipes open after the shell itself is killed.
        let started = Instant::now();
        let output = run_command_with_timeout(
            sh("sleep 4; echo finished"),
            Duration::from_millis(200),
            1000,
        )
        .expect("run");
        let elapsed = started.elapsed();
        assert!(output.timed_out);
        assert!(
            elapsed < Duration::from_secs(2),
            "timeout 200ms but command took {elapsed:?}"
        );
        assert!(!output.stdout_lossy().contains("finished"));
    }

    #[test]
    fn background_child_cannot_hold_output_open() {
        let started = Instant::now();
        let output = run_command_with_timeout(
            sh("sleep 4 & echo started"),
            Duration::from_secs(10),
            1000,
        )
        .expect("run");
        let elapsed = started.elapsed();
        assert!(!output.timed_out);
        assert!(output.status.success());
        assert!(
            elapsed < Duration::from_secs(2),
            "shell exited at once but collection took {elapsed:?}"
        );
    }

    #[test]
    fn truncates_output_beyond_limit() {
        let output =
            run_command_with_timeout(sh("printf 'abcdefghij'"), Duration::from_secs(10), 4)
                .expect("run");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"abcd");
        assert_eq!(output.stdout_truncated, 6);
    }

    #[test]
    fn missing_binary_is_an_error() {
        let err = run_command_with_timeout(
            Command::new("/nonexistent/packsync-test-binary"),
            Duration::from_secs(1),
            100,
        )
        .unwrap_err();
        assert!(err.to_string().contains("spawn command"));
    }
}
