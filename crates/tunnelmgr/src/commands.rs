//! Command builders for tunnel operations
//!
//! Every action is an ordered list of [`Invocation`]s. The order is fixed
//! here so it cannot drift between callers: a link must exist and be up
//! before it is enslaved to a bridge, and it is released from the bridge
//! before it is deleted.

use std::net::IpAddr;
use std::time::Duration;

use tunnelmgr_common::{exec, Invocation};

use crate::types::{Action, BridgeTool, ProbeParams, TunnelParams, TunnelTarget, TunnelType};

/// Names or paths of the external programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ip: String,
    pub brctl: String,
    pub ping: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ip: exec::IP_CMD.to_string(),
            brctl: exec::BRCTL_CMD.to_string(),
            ping: exec::PING_CMD.to_string(),
        }
    }
}

/// Build tunnel link creation command
///
/// VXLAN: `ip link add vxlan<VNI> type vxlan id <VNI> local <src> remote <dst> dev <dev> dstport <port>`.
/// GENEVE links take neither `local` nor `dev` in iproute2, so those are left out.
pub fn build_add_link_cmd(ip: &str, params: &TunnelParams) -> Invocation {
    let ifname = params.interface_name();
    let vni = params.vni.to_string();
    let src = params.src_host.to_string();
    let dst = params.dst_host.to_string();
    let port = params.dst_port.to_string();

    let mut args: Vec<&str> = vec![
        "link",
        "add",
        ifname.as_str(),
        "type",
        params.tunnel_type.kind(),
        "id",
        vni.as_str(),
    ];
    match params.tunnel_type {
        TunnelType::Vxlan => {
            args.extend([
                "local",
                src.as_str(),
                "remote",
                dst.as_str(),
                "dev",
                params.dev.as_str(),
            ]);
        }
        TunnelType::Geneve => {
            args.extend(["remote", dst.as_str()]);
        }
    }
    args.extend(["dstport", port.as_str()]);

    Invocation::new(ip, args)
}

/// Build link bring-up command
pub fn build_set_link_up_cmd(ip: &str, ifname: &str) -> Invocation {
    Invocation::new(ip, ["link", "set", ifname, "up"])
}

/// Build bridge attach command
pub fn build_set_master_cmd(ip: &str, ifname: &str, bridge: &str) -> Invocation {
    Invocation::new(ip, ["link", "set", "dev", ifname, "master", bridge])
}

/// Build bridge detach command
pub fn build_set_nomaster_cmd(ip: &str, ifname: &str) -> Invocation {
    Invocation::new(ip, ["link", "set", "dev", ifname, "nomaster"])
}

/// Build brctl attach command
pub fn build_brctl_addif_cmd(brctl: &str, bridge: &str, ifname: &str) -> Invocation {
    Invocation::new(brctl, ["addif", bridge, ifname])
}

/// Build brctl detach command
pub fn build_brctl_delif_cmd(brctl: &str, bridge: &str, ifname: &str) -> Invocation {
    Invocation::new(brctl, ["delif", bridge, ifname])
}

/// Build link deletion command
pub fn build_del_link_cmd(ip: &str, ifname: &str) -> Invocation {
    Invocation::new(ip, ["link", "del", ifname])
}

/// Build detailed listing of all links of one tunnel kind
pub fn build_show_links_cmd(ip: &str, tunnel_type: TunnelType) -> Invocation {
    Invocation::new(ip, ["-d", "link", "show", "type", tunnel_type.kind()])
}

/// Build single link lookup command
pub fn build_show_link_cmd(ip: &str, ifname: &str) -> Invocation {
    Invocation::new(ip, ["link", "show", "dev", ifname])
}

/// Build a single-echo reachability probe sourced from `src`
pub fn build_ping_cmd(ping: &str, src: IpAddr, dst: IpAddr, timeout: Duration) -> Invocation {
    let wait = timeout.as_secs().max(1).to_string();
    let src = src.to_string();
    let dst = dst.to_string();
    Invocation::new(
        ping,
        ["-c", "1", "-W", wait.as_str(), "-I", src.as_str(), dst.as_str()],
    )
}

/// Produces the invocation sequence of each action
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    tools: ToolPaths,
    bridge_tool: BridgeTool,
}

impl CommandBuilder {
    pub fn new(tools: ToolPaths, bridge_tool: BridgeTool) -> Self {
        Self { tools, bridge_tool }
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    pub fn bridge_tool(&self) -> BridgeTool {
        self.bridge_tool
    }

    /// Create, bring up, attach to bridge
    pub fn create_sequence(&self, params: &TunnelParams) -> Vec<Invocation> {
        let ifname = params.interface_name();
        let attach = match self.bridge_tool {
            BridgeTool::Ip => build_set_master_cmd(&self.tools.ip, &ifname, &params.bridge_name),
            BridgeTool::Brctl => {
                build_brctl_addif_cmd(&self.tools.brctl, &params.bridge_name, &ifname)
            }
        };

        vec![
            build_add_link_cmd(&self.tools.ip, params),
            build_set_link_up_cmd(&self.tools.ip, &ifname),
            attach,
        ]
    }

    /// Detach from bridge, delete
    pub fn cleanup_sequence(&self, target: &TunnelTarget) -> Vec<Invocation> {
        let ifname = target.interface_name();
        let detach = match self.bridge_tool {
            BridgeTool::Ip => build_set_nomaster_cmd(&self.tools.ip, &ifname),
            BridgeTool::Brctl => {
                build_brctl_delif_cmd(&self.tools.brctl, &target.bridge_name, &ifname)
            }
        };

        vec![detach, build_del_link_cmd(&self.tools.ip, &ifname)]
    }

    pub fn list_invocation(&self, tunnel_type: TunnelType) -> Invocation {
        build_show_links_cmd(&self.tools.ip, tunnel_type)
    }

    /// Tunnel link present, then underlay reachable
    pub fn validate_sequence(&self, probe: &ProbeParams) -> Vec<Invocation> {
        vec![
            build_show_link_cmd(&self.tools.ip, &probe.interface_name()),
            build_ping_cmd(&self.tools.ping, probe.src_host, probe.dst_host, probe.timeout),
        ]
    }

    /// Programs an action will run, in first-use order
    pub fn required_tools(&self, action: Action) -> Vec<&str> {
        match (action, self.bridge_tool) {
            (Action::Create | Action::Cleanup, BridgeTool::Brctl) => {
                vec![self.tools.ip.as_str(), self.tools.brctl.as_str()]
            }
            (Action::Validate, _) => vec![self.tools.ip.as_str(), self.tools.ping.as_str()],
            _ => vec![self.tools.ip.as_str()],
        }
    }
}
