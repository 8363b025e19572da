//! Test infrastructure for tunnelmgr
//!
//! Provides:
//! - A recording executor with canned outputs and failure injection
//! - Command sequence verification helpers
//! - Fixtures for endpoints and `ip -d link show` output

pub mod executor;
pub mod fixtures;
mod verification;

pub use executor::{InjectedFailure, RecordingExecutor};
pub use fixtures::*;
pub use verification::*;
