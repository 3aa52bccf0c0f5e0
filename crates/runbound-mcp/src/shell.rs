//! Shell module - shell selection, invocation flags and tool environment
//!
//! Picks the shell a command runs under and turns a command line into the
//! [`SpawnSpec`] handed to the supervisor.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use runbound_process::SpawnSpec;
use tracing::{debug, warn};

use crate::encoding::encode_command;

/// Shells known to be incompatible with command execution
const SHELL_BLACKLIST: &[&str] = &["fish", "nu"];

/// Shell detection and selection utilities
pub struct ShellDetector;

impl ShellDetector {
    /// Get an acceptable shell for command execution
    ///
    /// Returns `SHELL` env var unless it's blacklisted (fish, nu), otherwise falls back.
    ///
    /// # Examples
    /// ```
    /// use runbound_mcp::shell::ShellDetector;
    ///
    /// let shell = ShellDetector::acceptable();
    /// assert!(!ShellDetector::is_blacklisted(&shell));
    /// ```
    pub fn acceptable() -> String {
        if let Ok(shell) = env::var("SHELL") {
            if !shell.is_empty() && !Self::is_blacklisted(&shell) {
                debug!(shell = %shell, "Using acceptable SHELL");
                return shell;
            }

            warn!(
                shell = %shell,
                reason = "blacklisted or empty",
                "Skipping SHELL environment variable"
            );
        }

        let fallback = Self::fallback();
        debug!(fallback = %fallback, "Using acceptable fallback shell");
        fallback
    }

    /// Get OS-specific fallback shell
    ///
    /// - Windows: `pwsh` or `powershell` on `PATH`, else `COMSPEC`, else `cmd.exe`
    /// - macOS: `/bin/zsh`
    /// - Linux/other: `bash` if found, else `/bin/sh`
    fn fallback() -> String {
        #[cfg(windows)]
        {
            for candidate in ["pwsh", "powershell"] {
                if let Ok(path) = which::which(candidate) {
                    debug!(shell = %path.display(), "Found PowerShell via PATH");
                    return path.to_string_lossy().to_string();
                }
            }

            if let Ok(comspec) = env::var("COMSPEC") {
                debug!(comspec = %comspec, "Using COMSPEC");
                return comspec;
            }

            "cmd.exe".to_string()
        }

        #[cfg(target_os = "macos")]
        {
            "/bin/zsh".to_string()
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            if let Ok(bash) = which::which("bash") {
                debug!(bash = %bash.display(), "Found bash via PATH");
                return bash.to_string_lossy().to_string();
            }

            "/bin/sh".to_string()
        }

        #[cfg(not(any(unix, windows)))]
        {
            "sh".to_string()
        }
    }

    /// Check if a shell is blacklisted
    ///
    /// # Examples
    /// ```
    /// use runbound_mcp::shell::ShellDetector;
    ///
    /// assert!(ShellDetector::is_blacklisted("/usr/bin/fish"));
    /// assert!(!ShellDetector::is_blacklisted("/bin/bash"));
    /// ```
    pub fn is_blacklisted(shell: &str) -> bool {
        let basename = Path::new(shell)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");

        SHELL_BLACKLIST.contains(&basename)
    }
}

/// Command-line convention a shell expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// sh, bash, zsh and friends: `-c <command>`
    Posix,
    /// pwsh / powershell: `-EncodedCommand <base64 utf-16le>`
    PowerShell,
    /// cmd.exe: `/d /s /c <command>`
    Cmd,
}

impl ShellKind {
    /// Classify a shell by its executable name
    pub fn detect(program: &str) -> Self {
        let basename = program
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(program)
            .to_ascii_lowercase();
        let stem = basename.strip_suffix(".exe").unwrap_or(&basename);

        match stem {
            "pwsh" | "powershell" => ShellKind::PowerShell,
            "cmd" => ShellKind::Cmd,
            _ => ShellKind::Posix,
        }
    }

    /// Fixed flags placed before the command argument
    pub fn flags(&self) -> &'static [&'static str] {
        match self {
            ShellKind::Posix => &["-c"],
            ShellKind::PowerShell => &["-NoLogo", "-NoProfile", "-NonInteractive", "-EncodedCommand"],
            ShellKind::Cmd => &["/d", "/s", "/c"],
        }
    }
}

/// A resolved shell: executable plus the way commands are passed to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    program: String,
    kind: ShellKind,
}

impl ShellInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let kind = ShellKind::detect(&program);
        Self { program, kind }
    }

    /// Use `configured` when given, otherwise detect an acceptable shell
    pub fn resolve(configured: Option<&str>) -> Self {
        match configured {
            Some(shell) if !shell.trim().is_empty() => {
                debug!(shell = %shell, "Using configured shell");
                Self::new(shell)
            }
            _ => Self::new(ShellDetector::acceptable()),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    /// Build the spawn specification for one command line
    pub fn spawn_spec(&self, command: &str, cwd: Option<&Path>) -> SpawnSpec {
        let spec = SpawnSpec::new(self.program.clone())
            .args(self.kind.flags().iter().copied())
            .arg(encode_command(self.kind, command))
            .envs(Environment::create_tool_env());

        match cwd {
            Some(dir) => spec.working_dir(dir),
            None => spec,
        }
    }
}

/// Environment normalization for non-interactive command execution
pub struct Environment;

impl Environment {
    /// Sets `TERM=dumb` to avoid interactive formatting/control sequences in command output.
    pub fn normalize_for_tools(env_vars: &mut HashMap<String, String>) {
        env_vars.insert("TERM".to_string(), "dumb".to_string());
    }

    /// Create normalized environment overrides for tool execution
    pub fn create_tool_env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        Self::normalize_for_tools(&mut env);
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_shell_blacklist() {
        assert!(ShellDetector::is_blacklisted("/usr/bin/fish"));
        assert!(ShellDetector::is_blacklisted("/usr/local/bin/nu"));
        assert!(ShellDetector::is_blacklisted("fish"));

        assert!(!ShellDetector::is_blacklisted("/bin/bash"));
        assert!(!ShellDetector::is_blacklisted("/bin/zsh"));
    }

    #[test]
    #[serial]
    fn test_acceptable_skips_blacklisted_shell() {
        let previous = env::var("SHELL").ok();
        env::set_var("SHELL", "/usr/bin/fish");

        let shell = ShellDetector::acceptable();
        assert!(!ShellDetector::is_blacklisted(&shell));

        match previous {
            Some(value) => env::set_var("SHELL", value),
            None => env::remove_var("SHELL"),
        }
    }

    #[test]
    fn test_shell_kind_detection() {
        assert_eq!(ShellKind::detect("/bin/bash"), ShellKind::Posix);
        assert_eq!(ShellKind::detect("sh"), ShellKind::Posix);
        assert_eq!(ShellKind::detect("pwsh"), ShellKind::PowerShell);
        assert_eq!(
            ShellKind::detect(r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe"),
            ShellKind::PowerShell
        );
        assert_eq!(ShellKind::detect(r"C:\Windows\system32\CMD.EXE"), ShellKind::Cmd);
    }

    #[test]
    fn test_posix_spawn_spec() {
        let shell = ShellInvocation::new("/bin/sh");
        let spec = shell.spawn_spec("echo hi | wc -c", Some(Path::new("/tmp")));

        assert_eq!(spec.program, "/bin/sh");
        assert_eq!(spec.args, vec!["-c".to_string(), "echo hi | wc -c".to_string()]);
        assert_eq!(spec.working_dir.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(spec.env.get("TERM"), Some(&"dumb".to_string()));
    }

    #[test]
    fn test_powershell_spawn_spec_encodes_command() {
        let shell = ShellInvocation::new("pwsh");
        let spec = shell.spawn_spec("dir", None);

        assert_eq!(shell.kind(), ShellKind::PowerShell);
        assert_eq!(spec.args.last().map(String::as_str), Some("ZABpAHIA"));
        assert_eq!(spec.args[spec.args.len() - 2], "-EncodedCommand");
        assert!(spec.working_dir.is_none());
    }

    #[test]
    fn test_resolve_prefers_configured_shell() {
        let shell = ShellInvocation::resolve(Some("/bin/dash"));
        assert_eq!(shell.program(), "/bin/dash");
        assert_eq!(shell.kind(), ShellKind::Posix);
    }

    #[test]
    fn test_create_tool_env() {
        let env = Environment::create_tool_env();
        assert_eq!(env.get("TERM"), Some(&"dumb".to_string()));
    }
}
