//! Bounded external process execution
//!
//! A submission's scripts run as child processes under a wall-clock limit.
//! Running out of time is an expected outcome and is reported as
//! `Outcome::TimedOut`, never as an error. The child is placed in its own
//! process group so the whole tree can be killed, leaving nothing running
//! once `run` returns.

use crate::process_tree;
use crate::timing::timed_async;
use irgrade_core::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to wait for output pipes to close after the process is gone
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

/// How a bounded process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The limit expired and the process tree was killed
    TimedOut,
    /// The process exited on its own; signal deaths are reported as `128 + signal`
    Completed(i32),
}

impl Outcome {
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Completed with exit code 0
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Completed(0))
    }
}

/// Program plus arguments for one external step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs commands with a working directory and a time limit
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    capture_limit: usize,
}

impl ProcessRunner {
    /// Create a runner keeping at most `capture_limit` trailing bytes of each output stream
    pub fn new(capture_limit: usize) -> Self {
        Self { capture_limit }
    }

    /// Run `spec` from `cwd`, waiting at most `timeout`
    ///
    /// Returns an error only when the process cannot be started or waited on.
    pub async fn run(&self, spec: &CommandSpec, cwd: &Path, timeout: Duration) -> Result<Outcome> {
        self.run_timed(spec, cwd, timeout)
            .await
            .map(|(outcome, _)| outcome)
    }

    /// Like [`run`](Self::run), also returning how long the process ran
    ///
    /// The duration stops when the process exits or the limit expires; time
    /// spent cleaning up and draining output is not included.
    pub async fn run_timed(
        &self,
        spec: &CommandSpec,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<(Outcome, Duration)> {
        let marker = process_tree::next_marker();
        let mut command = Command::new(spec.program());
        command
            .args(spec.args())
            .current_dir(cwd)
            .env(process_tree::STEP_MARKER_VAR, &marker)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            Error::process(format!(
                "Failed to spawn `{spec}` in {}: {e}",
                cwd.display()
            ))
        })?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(capture_tail(pipe, self.capture_limit)));
        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(capture_tail(pipe, self.capture_limit)));

        let (waited, elapsed) = timed_async(tokio::time::timeout(timeout, child.wait())).await;
        let outcome = match waited {
            Ok(status) => {
                let status = status
                    .map_err(|e| Error::process(format!("Failed to wait on `{spec}`: {e}")))?;
                Outcome::Completed(exit_code(status))
            }
            Err(_) => Outcome::TimedOut,
        };

        // Nothing started by the step may outlive it. A timed-out leader is
        // still unreaped, so its pid is safe to walk from; a reaped one is not.
        let live_root = if outcome.timed_out() { pid } else { None };
        let sweep = tokio::task::spawn_blocking(move || process_tree::sweep(live_root, &marker));
        if let Err(e) = sweep.await {
            warn!("Process sweep task failed: {e}");
        }
        kill_process_group(pid);
        if outcome.timed_out() {
            if let Err(e) = child.kill().await {
                debug!("Child already gone after group kill: {e}");
            }
        }

        let stdout = collect_capture(stdout).await;
        let stderr = collect_capture(stderr).await;

        debug!(
            command = %spec,
            ?outcome,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "Process finished"
        );
        if !outcome.succeeded() && !stderr.is_empty() {
            debug!("stderr tail of `{spec}`:\n{}", String::from_utf8_lossy(&stderr));
        }

        Ok((outcome, elapsed))
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {pid}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Read a stream to EOF, keeping only its last `limit` bytes
async fn capture_tail<R>(mut reader: R, limit: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut tail = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > limit {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
        }
    }
    tail
}

async fn collect_capture(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    let Some(mut handle) = handle else {
        return Vec::new();
    };
    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            warn!("Output capture task failed: {e}");
            Vec::new()
        }
        Err(_) => {
            // A descendant escaped the process group and still holds the pipe
            handle.abort();
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;
    use tempfile::TempDir;

    fn bash(script: &str) -> CommandSpec {
        CommandSpec::new("bash").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_completed_not_timeout() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1024);

        let outcome = runner
            .run(&bash("exit 1"), dir.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Completed(1));
        assert!(!outcome.timed_out());
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_zero_exit_runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1024);

        let outcome = runner
            .run(&bash("pwd > where.txt"), dir.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(outcome.succeeded());

        let recorded = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        assert_eq!(
            std::fs::canonicalize(recorded.trim()).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_sleeper_times_out_quickly() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1024);

        let start = Instant::now();
        let outcome = runner
            .run(&bash("sleep 30"), dir.path(), Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_large_output_does_not_block() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(256);

        let outcome = runner
            .run(
                &bash("head -c 2000000 /dev/zero; echo done >&2"),
                dir.path(),
                Duration::from_secs(20),
            )
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Completed(0));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new(1024);

        let result = runner
            .run(
                &CommandSpec::new("definitely-not-a-real-program-xyz"),
                dir.path(),
                Duration::from_secs(1),
            )
            .await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("definitely-not-a-real-program-xyz"));
    }

    #[tokio::test]
    async fn test_capture_tail_keeps_last_bytes() {
        let data: &[u8] = b"0123456789abcdef";
        let tail = capture_tail(data, 4).await;
        assert_eq!(tail, b"cdef".to_vec());
    }

    #[test]
    fn test_command_spec_display() {
        let spec = CommandSpec::new("bash")
            .arg("index.sh")
            .arg("/data/dump.xml")
            .arg("/work/index");
        assert_eq!(spec.to_string(), "bash index.sh /data/dump.xml /work/index");
        assert_eq!(spec.args().len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_death_maps_to_shell_convention() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
    }
}
