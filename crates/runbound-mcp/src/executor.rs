//! The `execute` operation: shell command in, bounded outcome out

use std::path::Path;

use runbound_process::{ExecutionOutcome, LimitDefaults, Limits, ProcessSupervisor};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::ExecuteError;
use crate::shell::ShellInvocation;

/// Runs shell command lines under the process supervisor
///
/// Holds no per-call state, so one executor serves any number of
/// concurrent invocations.
#[derive(Debug)]
pub struct CommandExecutor {
    supervisor: ProcessSupervisor,
    shell: ShellInvocation,
    defaults: LimitDefaults,
}

impl CommandExecutor {
    pub fn new(shell: ShellInvocation, defaults: LimitDefaults) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(),
            shell,
            defaults,
        }
    }

    /// Executor using the configured shell and limit defaults
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            ShellInvocation::resolve(config.shell.as_deref()),
            config.limit_defaults(),
        )
    }

    pub fn shell(&self) -> &ShellInvocation {
        &self.shell
    }

    pub fn defaults(&self) -> LimitDefaults {
        self.defaults
    }

    /// Execute one command line
    ///
    /// Empty commands and zero limits are rejected before anything is
    /// spawned. Spawn failures, timeouts and truncation are reported on the
    /// returned outcome.
    pub async fn execute(
        &self,
        command: &str,
        cwd: Option<&Path>,
        timeout_ms: Option<u64>,
        max_output_bytes: Option<u64>,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        if command.trim().is_empty() {
            return Err(ExecuteError::EmptyCommand);
        }

        let limits = Limits::resolve_with(&self.defaults, timeout_ms, max_output_bytes)?;
        let spec = self.shell.spawn_spec(command, cwd);

        info!(
            command = %command,
            shell = %self.shell.program(),
            timeout_ms = %limits.timeout().as_millis(),
            "Executing command"
        );

        let outcome = self.supervisor.run(spec, limits).await?;

        debug!(
            exit_code = ?outcome.exit_code,
            timed_out = outcome.timed_out,
            truncated = outcome.truncated,
            duration_ms = outcome.duration_ms,
            "Command finished"
        );
        Ok(outcome)
    }
}
