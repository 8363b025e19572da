//! External command execution for tunnel operations.
//!
//! Every change to host networking goes through a [`CommandExecutor`]. The
//! production [`SystemExecutor`] launches the program directly with a
//! discrete argument vector (no shell is involved, so nothing is split on
//! whitespace or expanded). [`DryRunExecutor`] fabricates output without
//! touching the system.
//!
//! # Example
//!
//! ```ignore
//! use tunnelmgr_common::exec::{self, Invocation, SystemExecutor};
//!
//! let executor = SystemExecutor::default();
//! let show = Invocation::new(exec::IP_CMD, ["-d", "link", "show", "type", "vxlan"]);
//! let result = exec::exec_checked(&executor, &show).await?;
//! println!("{}", result.stdout);
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::error::{TunnelError, TunnelResult};

/// Default name of the `ip` link configurator.
pub const IP_CMD: &str = "ip";

/// Default name of the legacy bridge control utility.
pub const BRCTL_CMD: &str = "brctl";

/// Default name of the ICMP probe utility.
pub const PING_CMD: &str = "ping";

/// Default time budget for a single invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments made only of these characters are rendered without quotes.
static PLAIN_ARG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$").expect("Invalid regex pattern"));

/// Characters that need escaping inside double quotes: $, `, ", \ and newline.
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string so it reads unambiguously as one shell word.
///
/// Only used when rendering command lines for logs and error messages;
/// execution never goes through a shell.
///
/// # Example
///
/// ```
/// use tunnelmgr_common::exec::shellquote;
///
/// assert_eq!(shellquote("simple"), "\"simple\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

fn render_arg(arg: &str) -> String {
    if PLAIN_ARG_RE.is_match(arg) {
        arg.to_string()
    } else {
        shellquote(arg)
    }
}

/// One external program call: the program and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation from a program name and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the argument vector.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_arg(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", render_arg(arg))?;
        }
        Ok(())
    }
}

/// Result of a completed external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// The exit code of the command (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// Captured stdout, unmodified.
    pub stdout: String,
    /// Captured stderr, unmodified.
    pub stderr: String,
}

impl ExecResult {
    /// Creates a successful result carrying the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed result with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns stdout followed by stderr.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stdout.ends_with('\n') {
            format!("{}{}", self.stdout, self.stderr)
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Returns a diagnostic for failed commands, `None` on success.
    pub fn error_detail(&self) -> Option<String> {
        if self.success() {
            None
        } else {
            Some(format!(
                "exit code {}: {}",
                self.exit_code,
                self.combined_output().trim()
            ))
        }
    }
}

/// Capability to run one external program and capture its output.
///
/// Implementations return `Err` only when the program could not be run to
/// completion (spawn failure, timeout). A program that ran and exited
/// non-zero is reported as an `Ok` result with `success() == false`.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs the invocation to completion.
    async fn execute(&self, invocation: &Invocation) -> TunnelResult<ExecResult>;
}

#[async_trait]
impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    async fn execute(&self, invocation: &Invocation) -> TunnelResult<ExecResult> {
        (**self).execute(invocation).await
    }
}

#[async_trait]
impl<T: CommandExecutor + ?Sized> CommandExecutor for Box<T> {
    async fn execute(&self, invocation: &Invocation) -> TunnelResult<ExecResult> {
        (**self).execute(invocation).await
    }
}

#[async_trait]
impl<T: CommandExecutor + ?Sized> CommandExecutor for Arc<T> {
    async fn execute(&self, invocation: &Invocation) -> TunnelResult<ExecResult> {
        (**self).execute(invocation).await
    }
}

/// Executor that launches real child processes.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    timeout: Duration,
}

impl SystemExecutor {
    /// Creates an executor that kills any invocation running longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the per-invocation time budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn execute(&self, invocation: &Invocation) -> TunnelResult<ExecResult> {
        let command = invocation.to_string();
        debug!(command = %command, "Executing command");

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| TunnelError::Spawn {
                command: command.clone(),
                source,
            })?,
            Err(_) => {
                warn!(command = %command, timeout = ?self.timeout, "Command timed out");
                return Err(TunnelError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
        };

        let result = ExecResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if result.success() {
            trace!(command = %command, "Command succeeded");
        } else {
            warn!(
                command = %command,
                exit_code = result.exit_code,
                stderr = %result.stderr.trim(),
                "Command failed"
            );
        }

        Ok(result)
    }
}

/// Executor that reports what would have run, without running it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl CommandExecutor for DryRunExecutor {
    async fn execute(&self, invocation: &Invocation) -> TunnelResult<ExecResult> {
        debug!(command = %invocation, "Dry run, not executing");
        Ok(ExecResult::ok(format!(
            "Executed {} with args [{}]\n",
            invocation.program(),
            invocation.args().join(" ")
        )))
    }
}

/// Executes an invocation and turns a non-zero exit into an error.
pub async fn exec_checked<E>(executor: &E, invocation: &Invocation) -> TunnelResult<ExecResult>
where
    E: CommandExecutor + ?Sized,
{
    let result = executor.execute(invocation).await?;
    if result.success() {
        Ok(result)
    } else {
        Err(TunnelError::CommandFailed {
            command: invocation.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output().trim().to_string(),
        })
    }
}

/// Finds `program` using the current `PATH`.
pub fn locate_program(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH").unwrap_or_else(OsString::new);
    locate_program_in(program, &path)
}

/// Finds `program` in the given `PATH`-style search list.
///
/// Names containing a `/` are checked as paths and not searched.
pub fn locate_program_in(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    if program.contains('/') {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }
    std::env::split_paths(search_path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// Like [`locate_program`], failing with [`TunnelError::ToolNotFound`].
pub fn require_program(program: &str) -> TunnelResult<PathBuf> {
    locate_program(program).ok_or_else(|| TunnelError::tool_not_found(program))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
