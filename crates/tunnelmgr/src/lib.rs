//! Tunnel Manager - VXLAN/GENEVE tunnel lifecycle on Linux bridges
//!
//! tunnelmgr drives the kernel's `ip` (and optionally `brctl`/`ping`)
//! tools to:
//! - Create a tunnel interface and attach it to an existing bridge
//! - Detach and delete a tunnel interface
//! - List tunnel interfaces in several output formats
//! - Check that a tunnel exists and its remote endpoint answers
//!
//! Every action is an ordered command sequence run through an injected
//! [`CommandExecutor`](tunnelmgr_common::CommandExecutor), stopping at the
//! first failure.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod inventory;
pub mod tunnel_mgr;
pub mod types;

pub use commands::{CommandBuilder, ToolPaths};
pub use config::TunnelMgrConfig;
pub use format::OutputFormat;
pub use inventory::{Field, Listing, TunnelRecord};
pub use tunnel_mgr::{ActionReport, StepOutput, TunnelMgr};
pub use types::{BridgeTool, ProbeParams, TunnelParams, TunnelTarget, TunnelType, Vni};
