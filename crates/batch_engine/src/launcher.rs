//! Fetch tool invocation under a hard wall-clock budget.
//!
//! The tool runs in its own process group. A [`ProcessGroup`] guard kills the
//! whole group with `SIGKILL` when the deadline passes and again when the
//! guard is dropped, so browsers spawned by the tool never outlive the job.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use batch_core::{Job, ProxyAssignment};
use batch_logging::batch_info;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size kept per stream (10 MiB). The rest is drained and dropped.
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Program and fixed arguments used to run the fetch tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCommand {
    pub program: String,
    /// Arguments placed before the per-job flags.
    pub args: Vec<String>,
    /// Browser launch flags, passed to the tool as a JSON array.
    pub launch_flags: Vec<String>,
}

impl Default for FetchCommand {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            args: vec!["run".to_string(), "crawl".to_string(), "--".to_string()],
            launch_flags: vec!["--no-sandbox".to_string()],
        }
    }
}

impl FetchCommand {
    /// Full argument list for one job: `<args> -b <browser> -u <target> -o <output> -x <flags>`.
    pub fn arguments(&self, browser_path: &Path, target: &str, output_path: &Path) -> Vec<String> {
        let flags = serde_json::to_string(&self.launch_flags).unwrap_or_else(|_| "[]".to_string());
        let mut args = self.args.clone();
        args.extend([
            "-b".to_string(),
            browser_path.display().to_string(),
            "-u".to_string(),
            target.to_string(),
            "-o".to_string(),
            output_path.display().to_string(),
            "-x".to_string(),
            flags,
        ]);
        args
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub job: &'a Job,
    pub browser_path: &'a Path,
    pub proxy: &'a ProxyAssignment,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchResult {
    /// The tool exited and closed its output streams before the deadline.
    Exited {
        code: Option<i32>,
        /// Captured stdout, a newline, then captured stderr.
        log: String,
    },
    /// The deadline passed; the process group has been killed.
    TimedOut,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for fetch tool: {0}")]
    Wait(#[source] io::Error),
}

#[async_trait::async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, request: LaunchRequest<'_>) -> Result<LaunchResult, LaunchError>;
}

/// Runs the fetch tool as a real child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    command: FetchCommand,
}

impl ProcessLauncher {
    pub fn new(command: FetchCommand) -> Self {
        Self { command }
    }
}

#[async_trait::async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, request: LaunchRequest<'_>) -> Result<LaunchResult, LaunchError> {
        let args = self.command.arguments(
            request.browser_path,
            &request.job.target,
            &request.job.output_path,
        );
        batch_info!(
            "worker {} via port {}: {} {}",
            request.proxy.worker,
            request.proxy.port,
            self.command.program,
            args.join(" ")
        );

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&args)
            .envs(request.proxy.env_vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: self.command.program.clone(),
            source,
        })?;
        let mut group = ProcessGroup::new(child.id());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(read_stream(stdout));
        let stderr_task = tokio::spawn(read_stream(stderr));

        // Like a blocking `communicate`: done once the child has exited and both
        // streams hit EOF, which also waits on descendants holding the pipes.
        let finished = tokio::time::timeout(request.timeout, async {
            let status = child.wait().await;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            (status, stdout, stderr)
        })
        .await;

        match finished {
            Ok((Ok(status), stdout, stderr)) => {
                let log = format!(
                    "{}\n{}",
                    String::from_utf8_lossy(&stdout),
                    String::from_utf8_lossy(&stderr)
                );
                Ok(LaunchResult::Exited {
                    code: status.code(),
                    log,
                })
            }
            Ok((Err(err), _, _)) => Err(LaunchError::Wait(err)),
            Err(_elapsed) => {
                group.kill();
                // Reap the leader; the readers finish on their own once the pipes close.
                let _ = child.start_kill();
                let _ = child.wait().await;
                Ok(LaunchResult::TimedOut)
            }
        }
    }
}

/// Scoped handle on the child's process group.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            // Never 0: killpg(0) would target our own group.
            pgid: pid
                .and_then(|pid| i32::try_from(pid).ok())
                .filter(|pgid| *pgid > 0),
        }
    }

    /// Sends `SIGKILL` to every process in the group. Idempotent.
    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: i32) {
    // SAFETY: killpg takes no pointers and only sends a signal. `pgid` is the
    // positive id of the group our child leads (see `ProcessGroup::new`), so
    // it can never address our own group. ESRCH means the group is already gone.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: i32) {
    // Without process groups only the direct child is killed, via `kill_on_drop`.
}

/// Read an entire output stream, keeping at most [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
        // Keep the pipe drained so a chatty tool never blocks on write.
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
