//! Process supervisor - spawn, collect, race the deadline, tear down

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::{
    collector::{OutputCollector, StreamKind},
    error::{ProcessError, Result},
    limits::Limits,
    outcome::{ExecutionOutcome, ResultAssembler, SettledRun},
    spec::SpawnSpec,
    terminator::{ProcessTreeTerminator, TreeTerminator},
};

/// Size of each read from a child pipe
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// How long to wait for a killed child to be reaped before killing it directly
const REAP_GRACE_MS: u64 = 5_000;

/// Signal reported for a forced termination whose real cause is unknown
const FORCED_TERMINATION_SIGNAL: &str = "SIGKILL";

/// Lifecycle of a single invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Spawning,
    Running,
    Settling,
    Done,
}

/// How the deadline race settled
#[derive(Debug)]
enum Settlement {
    /// Process exited and both streams reached EOF
    Exited(ExitStatus),
    /// Deadline fired first
    TimedOut,
    /// Waiting on the process or reading a stream failed
    Failed(String),
}

/// Runs one command to completion under [`Limits`]
///
/// Each call to [`run`](Self::run) owns its child and output collectors
/// exclusively, so a single supervisor can serve concurrent invocations.
#[derive(Debug)]
pub struct ProcessSupervisor<T = ProcessTreeTerminator> {
    terminator: T,
}

impl ProcessSupervisor {
    /// Create a supervisor backed by the platform tree terminator
    pub fn new() -> Self {
        Self {
            terminator: ProcessTreeTerminator::new(),
        }
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TreeTerminator> ProcessSupervisor<T> {
    /// Create a supervisor with a custom terminator
    pub fn with_terminator(terminator: T) -> Self {
        Self { terminator }
    }

    pub fn terminator(&self) -> &T {
        &self.terminator
    }

    /// Execute `spec` and return its outcome
    ///
    /// Only precondition failures are returned as `Err`. Spawn failures,
    /// timeouts, truncation and abnormal exits are all reported on the
    /// returned [`ExecutionOutcome`].
    ///
    /// # Examples
    /// ```no_run
    /// use runbound_process::{Limits, ProcessSupervisor, SpawnSpec};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let supervisor = ProcessSupervisor::new();
    /// let spec = SpawnSpec::new("sh").args(["-c", "echo hello"]);
    /// let outcome = supervisor.run(spec, Limits::default()).await?;
    /// assert_eq!(outcome.stdout, "hello\n");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(&self, spec: SpawnSpec, limits: Limits) -> Result<ExecutionOutcome> {
        ensure_supported_host()?;
        spec.validate()?;

        let started = Instant::now();
        let mut state = RunState::Spawning;
        debug!(
            program = %spec.program,
            args = ?spec.args,
            timeout_ms = %limits.timeout().as_millis(),
            max_bytes = %limits.max_bytes_per_stream(),
            "Spawning process"
        );

        let mut stdout = OutputCollector::new(StreamKind::Stdout, limits.max_bytes_per_stream());
        let mut stderr = OutputCollector::new(StreamKind::Stderr, limits.max_bytes_per_stream());

        let mut child = match build_command(&spec).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %spec.program, error = %e, "Failed to spawn process");
                transition(&mut state, RunState::Done, None);
                let run = SettledRun::spawn_failed(
                    format!("Failed to spawn process: {}", e),
                    started.elapsed(),
                );
                return Ok(ResultAssembler::assemble(run, stdout, stderr));
            }
        };

        let pid = child.id();
        info!(pid = ?pid, program = %spec.program, "Process spawned");
        transition(&mut state, RunState::Running, pid);

        let settlement = race(&mut child, &mut stdout, &mut stderr, limits.timeout()).await;
        transition(&mut state, RunState::Settling, pid);

        let run = match settlement {
            Settlement::Exited(status) => {
                if stdout.is_truncated() || stderr.is_truncated() {
                    if let Some(pid) = pid {
                        debug!(pid = %pid, "Output truncated, terminating remaining process tree");
                        self.terminator.kill_tree(pid).await;
                    }
                }
                let (exit_code, signal) = status_parts(&status);
                debug!(pid = ?pid, exit_code = ?exit_code, signal = ?signal, "Process closed");
                SettledRun {
                    exit_code,
                    signal,
                    timed_out: false,
                    error: None,
                    duration: started.elapsed(),
                }
            }
            Settlement::TimedOut => {
                warn!(
                    pid = ?pid,
                    timeout_ms = %limits.timeout().as_millis(),
                    "Process timed out"
                );
                let status = self.terminate(&mut child, pid).await;
                let signal = status
                    .as_ref()
                    .and_then(|status| status_parts(status).1)
                    .unwrap_or_else(|| FORCED_TERMINATION_SIGNAL.to_string());
                SettledRun {
                    exit_code: None,
                    signal: Some(signal),
                    timed_out: true,
                    error: None,
                    duration: started.elapsed(),
                }
            }
            Settlement::Failed(error) => {
                warn!(pid = ?pid, error = %error, "Process failed while running");
                self.terminate(&mut child, pid).await;
                SettledRun {
                    exit_code: None,
                    signal: None,
                    timed_out: false,
                    error: Some(error),
                    duration: started.elapsed(),
                }
            }
        };

        transition(&mut state, RunState::Done, pid);
        Ok(ResultAssembler::assemble(run, stdout, stderr))
    }

    /// Kill the tree and reap the child so no zombie outlives the call
    async fn terminate(&self, child: &mut Child, pid: Option<u32>) -> Option<ExitStatus> {
        if let Some(pid) = pid {
            self.terminator.kill_tree(pid).await;
        }
        reap(child).await
    }
}

/// Deadline race: natural close against the timeout, settled exactly once
///
/// Both collectors are mutated only here. Reading continues after a
/// collector is truncated so the child never stalls on a full pipe.
async fn race(
    child: &mut Child,
    stdout: &mut OutputCollector,
    stderr: &mut OutputCollector,
    timeout: Duration,
) -> Settlement {
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout_buf = vec![0u8; READ_CHUNK_SIZE];
    let mut stderr_buf = vec![0u8; READ_CHUNK_SIZE];
    let mut exit_status: Option<ExitStatus> = None;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        if let Some(status) = exit_status {
            if stdout_pipe.is_none() && stderr_pipe.is_none() {
                return Settlement::Exited(status);
            }
        }

        tokio::select! {
            read = read_chunk(&mut stdout_pipe, &mut stdout_buf) => match read {
                Ok(0) => stdout_pipe = None,
                Ok(n) => stdout.append(&stdout_buf[..n]),
                Err(e) => return Settlement::Failed(format!("Failed to read stdout: {}", e)),
            },
            read = read_chunk(&mut stderr_pipe, &mut stderr_buf) => match read {
                Ok(0) => stderr_pipe = None,
                Ok(n) => stderr.append(&stderr_buf[..n]),
                Err(e) => return Settlement::Failed(format!("Failed to read stderr: {}", e)),
            },
            status = child.wait(), if exit_status.is_none() => match status {
                Ok(status) => exit_status = Some(status),
                Err(e) => return Settlement::Failed(format!("Failed to wait for process: {}", e)),
            },
            _ = &mut deadline => return Settlement::TimedOut,
        }
    }
}

/// Read from a pipe, or pend forever once it has been closed
async fn read_chunk<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn reap(child: &mut Child) -> Option<ExitStatus> {
    let grace = Duration::from_millis(REAP_GRACE_MS);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => return Some(status),
        Ok(Err(e)) => {
            warn!(error = %e, "Error waiting for terminated process");
            return None;
        }
        Err(_) => warn!("Process survived tree kill, killing it directly"),
    }

    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Failed to kill process");
    }
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        _ => None,
    }
}

fn build_command(spec: &SpawnSpec) -> Command {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    if let Some(ref dir) = spec.working_dir {
        cmd.current_dir(dir);
    }

    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    // Group leader, so the whole tree can be signalled at once
    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

fn transition(state: &mut RunState, next: RunState, pid: Option<u32>) {
    debug!(pid = ?pid, from = ?*state, to = ?next, "Run state transition");
    *state = next;
}

fn ensure_supported_host() -> Result<()> {
    if cfg!(any(unix, windows)) {
        Ok(())
    } else {
        Err(ProcessError::UnsupportedPlatform(std::env::consts::OS))
    }
}

/// Split an exit status into (code, signal name)
fn status_parts(status: &ExitStatus) -> (Option<i32>, Option<String>) {
    (status.code(), exit_signal(status))
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<String> {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;

    status.signal().map(|raw| {
        Signal::try_from(raw)
            .map(|signal| signal.as_str().to_string())
            .unwrap_or_else(|_| format!("SIG{}", raw))
    })
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<String> {
    None
}
