//! Verification helpers for testing tunnel actions
//!
//! Provides assertion helpers over the command lines an executor captured

use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected command containing '{expected}' not executed; captured: {captured:?}")]
    CommandNotFound {
        expected: String,
        captured: Vec<String>,
    },

    #[error("Command '{command}' was executed but should not have been")]
    UnexpectedCommand { command: String },

    #[error("Expected {expected} commands, found {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Command {index} mismatch: expected '{expected}', got '{actual}'")]
    SequenceMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Command execution verifier
pub struct CommandVerifier {
    captured_commands: Vec<String>,
}

impl CommandVerifier {
    /// Create a new command verifier
    pub fn new(captured_commands: Vec<String>) -> Self {
        Self { captured_commands }
    }

    /// Verify that a command containing `expected` was executed
    pub fn assert_command_executed(&self, expected: &str) -> VerifyResult<()> {
        if self
            .captured_commands
            .iter()
            .any(|cmd| cmd.contains(expected))
        {
            Ok(())
        } else {
            Err(VerificationError::CommandNotFound {
                expected: expected.to_string(),
                captured: self.captured_commands.clone(),
            })
        }
    }

    /// Verify that no command containing `expected` was executed
    pub fn assert_command_not_executed(&self, expected: &str) -> VerifyResult<()> {
        match self
            .captured_commands
            .iter()
            .find(|cmd| cmd.contains(expected))
        {
            Some(cmd) => Err(VerificationError::UnexpectedCommand {
                command: cmd.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Verify the number of commands executed
    pub fn assert_command_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.captured_commands.len();
        if actual != expected {
            Err(VerificationError::CountMismatch { expected, actual })
        } else {
            Ok(())
        }
    }

    /// Verify the exact command lines, in order
    pub fn assert_sequence(&self, expected: &[&str]) -> VerifyResult<()> {
        for (index, (want, got)) in expected.iter().zip(&self.captured_commands).enumerate() {
            if *want != got.as_str() {
                return Err(VerificationError::SequenceMismatch {
                    index,
                    expected: want.to_string(),
                    actual: got.clone(),
                });
            }
        }
        self.assert_command_count(expected.len())
    }

    /// Verify that every command mentions `ifname` as a whole argument
    pub fn assert_all_target(&self, ifname: &str) -> VerifyResult<()> {
        match self
            .captured_commands
            .iter()
            .find(|cmd| !cmd.split(' ').any(|arg| arg == ifname))
        {
            Some(cmd) => Err(VerificationError::UnexpectedCommand {
                command: cmd.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Get all captured commands
    pub fn captured_commands(&self) -> &[String] {
        &self.captured_commands
    }
}
