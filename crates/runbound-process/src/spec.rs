//! Spawn specification

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{ProcessError, Result};

/// Everything needed to launch one child process
///
/// Built once per invocation and consumed by
/// [`ProcessSupervisor::run`](crate::ProcessSupervisor::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    /// Executable path or name resolved through `PATH`
    pub program: String,
    /// Arguments, passed through verbatim and in order
    pub args: Vec<String>,
    /// Working directory (None = inherit)
    pub working_dir: Option<PathBuf>,
    /// Environment variables layered over the inherited environment
    pub env: HashMap<String, String>,
}

impl SpawnSpec {
    /// Create a spawn specification for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            working_dir: None,
            env: HashMap::new(),
        }
    }

    /// Set command arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add several environment variables
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(ProcessError::InvalidSpawnSpec(
                "program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
