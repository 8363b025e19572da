//! Recording executor for tests
//!
//! Captures every invocation instead of running it. Responses can be canned
//! per command line, and one step can be made to fail.

use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tunnelmgr_common::{CommandExecutor, ExecResult, Invocation, TunnelError, TunnelResult};

use crate::verification::CommandVerifier;

/// Failure returned for an injected step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// The command runs and exits non-zero
    Exit { exit_code: i32, stderr: String },
    /// The program cannot be started
    Spawn,
    /// The command exceeds its time limit
    Timeout,
}

impl InjectedFailure {
    fn into_result(self, invocation: &Invocation) -> TunnelResult<ExecResult> {
        match self {
            InjectedFailure::Exit { exit_code, stderr } => Ok(ExecResult::failed(exit_code, stderr)),
            InjectedFailure::Spawn => Err(TunnelError::Spawn {
                command: invocation.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
            InjectedFailure::Timeout => Err(TunnelError::Timeout {
                command: invocation.to_string(),
                timeout: Duration::from_secs(30),
            }),
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Invocation>,
    responses: HashMap<String, ExecResult>,
}

/// Executor that records invocations and fabricates results
#[derive(Default)]
pub struct RecordingExecutor {
    state: Mutex<State>,
    failure: Option<(usize, InjectedFailure)>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `step`-th call (1-based) exit with `exit_code`
    pub fn fail_at(self, step: usize, exit_code: i32, stderr: impl Into<String>) -> Self {
        self.inject(
            step,
            InjectedFailure::Exit {
                exit_code,
                stderr: stderr.into(),
            },
        )
    }

    /// Make the `step`-th call (1-based) fail with `failure`
    pub fn inject(mut self, step: usize, failure: InjectedFailure) -> Self {
        self.failure = Some((step, failure));
        self
    }

    /// Answer `command_line` with `stdout` and exit code 0
    pub fn with_stdout(self, command_line: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.with_response(command_line, ExecResult::ok(stdout))
    }

    pub fn with_response(self, command_line: impl Into<String>, result: ExecResult) -> Self {
        self.lock().responses.insert(command_line.into(), result);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invocations in call order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().calls.clone()
    }

    /// Rendered command lines in call order
    pub fn command_lines(&self) -> Vec<String> {
        self.lock().calls.iter().map(ToString::to_string).collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn verifier(&self) -> CommandVerifier {
        CommandVerifier::new(self.command_lines())
    }

    /// Forget recorded calls, keeping responses and the injected failure
    pub fn clear(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, invocation: &Invocation) -> TunnelResult<ExecResult> {
        let mut state = self.lock();
        state.calls.push(invocation.clone());
        let step = state.calls.len();
        debug!(step, command = %invocation, "Recorded command");

        if let Some((fail_step, failure)) = &self.failure {
            if *fail_step == step {
                return failure.clone().into_result(invocation);
            }
        }

        Ok(state
            .responses
            .get(&invocation.to_string())
            .cloned()
            .unwrap_or_else(|| ExecResult::ok("")))
    }
}
