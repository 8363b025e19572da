//! Wiring between the command line, configuration and the Tunnel Manager

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tunnelmgr_common::exec::require_program;
use tunnelmgr_common::{CommandExecutor, DryRunExecutor, SystemExecutor};

use crate::cli::{Cli, Commands, CreateArgs, ListArgs, ValidateArgs};
use crate::commands::{CommandBuilder, ToolPaths};
use crate::config::TunnelMgrConfig;
use crate::format;
use crate::inventory::{Field, Listing};
use crate::tunnel_mgr::{ActionReport, TunnelMgr};
use crate::types::{BridgeTool, ProbeParams, TunnelParams, TunnelTarget, TunnelType};

/// Effective settings after merging flags over configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tunnel_type: TunnelType,
    pub bridge_tool: BridgeTool,
    pub tools: ToolPaths,
    pub dev: String,
    pub exec_timeout: Duration,
    pub probe_timeout_secs: u64,
    pub dry_run: bool,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: &TunnelMgrConfig) -> Self {
        Self {
            tunnel_type: cli.tunnel_type.unwrap_or(config.defaults.tunnel_type),
            bridge_tool: cli.bridge_tool.unwrap_or(config.tools.bridge_tool),
            tools: config.tool_paths(),
            dev: config.defaults.dev.clone(),
            exec_timeout: config.exec_timeout(),
            probe_timeout_secs: config.probe.timeout_secs,
            dry_run: cli.dry_run,
        }
    }

    pub fn command_builder(&self) -> CommandBuilder {
        CommandBuilder::new(self.tools.clone(), self.bridge_tool)
    }
}

/// Tracing filter: `--log-level`, then `RUST_LOG`, then the config file, then `info`
pub fn log_filter(cli_level: Option<&str>, config_level: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = config_level.unwrap_or("info");
    EnvFilter::try_new(level)
        .with_context(|| format!("Invalid logging.level '{}' in config", level))
}

/// One-line rendering of an error and its causes
///
/// Library errors already embed their source in the message, so causes whose
/// text is already present are skipped.
pub fn error_report(err: &anyhow::Error) -> String {
    let mut report = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !report.contains(&text) {
            report.push_str(": ");
            report.push_str(&text);
        }
    }
    report
}

/// Run the parsed command line to completion, writing user output to `out`
pub async fn run<W: Write>(cli: &Cli, config: &TunnelMgrConfig, out: &mut W) -> Result<()> {
    let settings = Settings::resolve(cli, config);
    let commands = settings.command_builder();
    debug!(?settings, "Resolved settings");

    if settings.dry_run {
        let mgr = TunnelMgr::with_commands(DryRunExecutor, commands);
        return dispatch(&mgr, &settings, &cli.command, out).await;
    }

    for tool in commands.required_tools(cli.command.action()) {
        let path = require_program(tool)?;
        debug!("Using {} at {}", tool, path.display());
    }

    let mgr = TunnelMgr::with_commands(SystemExecutor::new(settings.exec_timeout), commands);
    dispatch(&mgr, &settings, &cli.command, out).await
}

/// Execute one subcommand against a manager
pub async fn dispatch<E, W>(
    mgr: &TunnelMgr<E>,
    settings: &Settings,
    command: &Commands,
    out: &mut W,
) -> Result<()>
where
    E: CommandExecutor,
    W: Write,
{
    match command {
        Commands::Create(args) => {
            let params = create_params(settings, args)?;
            let report = mgr
                .create_tunnel(&params)
                .await
                .with_context(|| format!("Failed to create tunnel {}", params.interface_name()))?;
            print_report(out, settings, &report)?;
            writeln!(out, "Tunnel created successfully.")?;
        }
        Commands::Cleanup(args) => {
            let target = TunnelTarget::new(settings.tunnel_type, args.vni, &args.bridge_name)?;
            let report = mgr
                .cleanup_tunnel(&target)
                .await
                .with_context(|| format!("Failed to clean up tunnel {}", target.interface_name()))?;
            print_report(out, settings, &report)?;
            writeln!(out, "Tunnel cleaned up successfully.")?;
        }
        Commands::Validate(args) => {
            let probe = probe_params(settings, args)?;
            let report = mgr.validate_tunnel(&probe).await.with_context(|| {
                format!(
                    "Connectivity check of {} to {} failed",
                    probe.interface_name(),
                    probe.dst_host
                )
            })?;
            print_report(out, settings, &report)?;
            writeln!(
                out,
                "Connectivity to {} VNI {} at {} is successful.",
                probe.tunnel_type.kind().to_uppercase(),
                probe.vni,
                probe.dst_host
            )?;
        }
        Commands::List(args) => list(mgr, settings, args, out).await?,
    }
    Ok(())
}

fn create_params(settings: &Settings, args: &CreateArgs) -> Result<TunnelParams> {
    let tunnel_type = settings.tunnel_type;
    let params = TunnelParams::new(
        tunnel_type,
        args.vni,
        &args.src_host,
        &args.dst_host,
        &args.bridge_name,
    )?
    .with_ports(
        args.src_port.unwrap_or(tunnel_type.default_port()),
        args.dst_port.unwrap_or(tunnel_type.default_port()),
    )?
    .with_dev(args.dev.as_deref().unwrap_or(&settings.dev))?;
    Ok(params)
}

fn probe_params(settings: &Settings, args: &ValidateArgs) -> Result<ProbeParams> {
    let probe = ProbeParams::new(settings.tunnel_type, args.vni, &args.src_host, &args.dst_host)?
        .with_timeout_secs(args.timeout.unwrap_or(settings.probe_timeout_secs))?;
    Ok(probe)
}

async fn list<E, W>(mgr: &TunnelMgr<E>, settings: &Settings, args: &ListArgs, out: &mut W) -> Result<()>
where
    E: CommandExecutor,
    W: Write,
{
    let fields = Field::select(&args.fields)?;
    let raw = mgr
        .list_tunnels(settings.tunnel_type)
        .await
        .with_context(|| format!("Failed to list {} tunnels", settings.tunnel_type))?;

    // Nothing to parse in a fabricated listing
    if settings.dry_run {
        write!(out, "{}", raw)?;
        return Ok(());
    }

    let listing = Listing::parse(raw);
    info!(
        "Found {} {} tunnel(s)",
        listing.records.len(),
        settings.tunnel_type
    );
    write!(out, "{}", format::render(&listing, args.format, &fields)?)?;
    Ok(())
}

/// Tool output is shown only for dry runs; real runs log it
fn print_report<W: Write>(out: &mut W, settings: &Settings, report: &ActionReport) -> Result<()> {
    for step in &report.steps {
        if settings.dry_run {
            write!(out, "{}", step.output)?;
        } else if !step.output.trim().is_empty() {
            debug!(command = %step.command, "{}", step.output.trim_end());
        }
    }
    Ok(())
}
