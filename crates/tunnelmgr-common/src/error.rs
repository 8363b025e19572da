//! Error types for tunnel operations.
//!
//! This module defines the error types used throughout the tunnelmgr crates.
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for tunnel operations.
pub type TunnelResult<T> = Result<T, TunnelError>;

/// Errors that can occur during tunnel operations.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Failed to start an external program (spawn error).
    #[error("Failed to execute command '{command}': {source}")]
    Spawn {
        /// The command line that failed to start.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// External program returned a non-zero exit code.
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    CommandFailed {
        /// The command line that failed.
        command: String,
        /// The exit code, -1 when terminated by a signal.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// External program did not finish within its time budget.
    #[error("Command timed out after {}s: '{command}'", timeout.as_secs_f64())]
    Timeout {
        /// The command line that was killed.
        command: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// One step of a multi-step action failed; later steps were not run.
    #[error("{action} step {step}/{total} failed: {source}")]
    StepFailed {
        /// The action being performed (e.g. "create", "cleanup").
        action: String,
        /// 1-based index of the failing step.
        step: usize,
        /// Number of steps in the action.
        total: usize,
        /// The underlying invocation failure.
        #[source]
        source: Box<TunnelError>,
    },

    /// A parameter is missing or malformed.
    #[error("Invalid value for {field}: {message}")]
    InvalidParameter {
        /// The parameter that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// A required external tool could not be located.
    #[error("Tool '{tool}' not found in PATH; please install it")]
    ToolNotFound {
        /// Name or path of the missing tool.
        tool: String,
    },

    /// Configuration file could not be read or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Listing output could not be rendered.
    #[error("Output formatting failed: {message}")]
    Format {
        /// Error message.
        message: String,
    },
}

impl TunnelError {
    /// Creates an invalid parameter error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an output formatting error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Creates a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Wraps an invocation failure with its position in an action.
    pub fn step_failed(action: impl Into<String>, step: usize, total: usize, source: Self) -> Self {
        Self::StepFailed {
            action: action.into(),
            step,
            total,
            source: Box::new(source),
        }
    }

    /// Returns the command line that caused this error, if any.
    pub fn failed_command(&self) -> Option<&str> {
        match self {
            TunnelError::Spawn { command, .. }
            | TunnelError::CommandFailed { command, .. }
            | TunnelError::Timeout { command, .. } => Some(command),
            TunnelError::StepFailed { source, .. } => source.failed_command(),
            _ => None,
        }
    }

    /// Returns the failing step index for step failures.
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            TunnelError::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}
