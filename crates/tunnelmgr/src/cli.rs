//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::format::OutputFormat;
use crate::types::{Action, BridgeTool, TunnelType};

/// Manage VXLAN and GENEVE tunnels between bridges
#[derive(Parser, Debug)]
#[command(name = "tunnelmgr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tunnel encapsulation [default: from config, else vxlan]
    #[arg(short = 't', long, value_enum, global = true)]
    pub tunnel_type: Option<TunnelType>,

    /// Bridge management tool [default: from config, else ip]
    #[arg(long, value_enum, global = true)]
    pub bridge_tool: Option<BridgeTool>,

    /// Configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print the commands instead of running them
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Log filter (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(short = 'l', long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a tunnel and attach it to a bridge
    Create(CreateArgs),
    /// Detach a tunnel from its bridge and delete it
    Cleanup(CleanupArgs),
    /// Check that a tunnel exists and its remote endpoint answers
    Validate(ValidateArgs),
    /// List tunnel interfaces
    List(ListArgs),
}

impl Commands {
    pub fn action(&self) -> Action {
        match self {
            Commands::Create(_) => Action::Create,
            Commands::Cleanup(_) => Action::Cleanup,
            Commands::Validate(_) => Action::Validate,
            Commands::List(_) => Action::List,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CreateArgs {
    /// Virtual network identifier
    #[arg(long)]
    pub vni: u32,

    /// Local underlay IP address
    #[arg(long)]
    pub src_host: String,

    /// Remote underlay IP address
    #[arg(long)]
    pub dst_host: String,

    /// Existing bridge to attach the tunnel to
    #[arg(long)]
    pub bridge_name: String,

    /// Source UDP port [default: per tunnel type]
    #[arg(long)]
    pub src_port: Option<u16>,

    /// Destination UDP port [default: 4789 for vxlan, 6081 for geneve]
    #[arg(long)]
    pub dst_port: Option<u16>,

    /// Parent network device [default: from config, else eth0]
    #[arg(long)]
    pub dev: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CleanupArgs {
    #[arg(long)]
    pub vni: u32,

    #[arg(long)]
    pub bridge_name: String,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ValidateArgs {
    #[arg(long)]
    pub src_host: String,

    #[arg(long)]
    pub dst_host: String,

    #[arg(long)]
    pub vni: u32,

    /// Probe timeout in seconds [default: from config, else 3]
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ListArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Fields to include, or "all"
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub fields: Vec<String>,
}
