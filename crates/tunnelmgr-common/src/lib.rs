//! Common infrastructure for the tunnelmgr tools.
//!
//! This crate holds the pieces that every tunnel action shares:
//!
//! - [`exec`]: the external command boundary ([`CommandExecutor`] and its
//!   real and dry-run implementations)
//! - [`error`]: error types for tunnel operations
//!
//! # Architecture
//!
//! An action is an ordered list of [`Invocation`]s. The caller drives each
//! one through an injected executor, stopping at the first failure:
//!
//! ```ignore
//! use tunnelmgr_common::{exec, CommandExecutor, Invocation, TunnelResult};
//!
//! async fn bring_up<E: CommandExecutor>(executor: &E, ifname: &str) -> TunnelResult<()> {
//!     let up = Invocation::new(exec::IP_CMD, ["link", "set", ifname, "up"]);
//!     exec::exec_checked(executor, &up).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod exec;

// Re-export commonly used items at crate root
pub use error::{TunnelError, TunnelResult};
pub use exec::{CommandExecutor, DryRunExecutor, ExecResult, Invocation, SystemExecutor};
