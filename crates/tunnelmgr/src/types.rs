//! Tunnel parameter types and constants

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tunnelmgr_common::{TunnelError, TunnelResult};

/// Largest VNI representable in the 24-bit VXLAN/GENEVE header field
pub const VNI_MAX: u32 = 16_777_215;

/// IANA port for VXLAN
pub const VXLAN_DEFAULT_PORT: u16 = 4789;

/// IANA port for GENEVE
pub const GENEVE_DEFAULT_PORT: u16 = 6081;

/// Parent device used when none is given
pub const DEFAULT_DEV: &str = "eth0";

/// Kernel limit on interface name length (IFNAMSIZ minus the NUL)
pub const IFNAME_MAX_LEN: usize = 15;

/// Default connectivity probe timeout in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

/// Upper bound for the connectivity probe timeout in seconds
pub const MAX_PROBE_TIMEOUT_SECS: u64 = 60;

/// Virtual Network Identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vni(u32);

impl Vni {
    /// Validate and wrap a raw VNI
    pub fn new(value: u32) -> TunnelResult<Self> {
        if value == 0 || value > VNI_MAX {
            return Err(TunnelError::invalid(
                "vni",
                format!("{} is out of range (1-{})", value, VNI_MAX),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Vni {
    type Error = TunnelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Vni {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overlay encapsulation
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TunnelType {
    #[default]
    Vxlan,
    Geneve,
}

impl TunnelType {
    /// Link kind as understood by `ip link ... type <kind>`
    pub fn kind(self) -> &'static str {
        match self {
            TunnelType::Vxlan => "vxlan",
            TunnelType::Geneve => "geneve",
        }
    }

    /// UDP destination port used when none is configured
    pub fn default_port(self) -> u16 {
        match self {
            TunnelType::Vxlan => VXLAN_DEFAULT_PORT,
            TunnelType::Geneve => GENEVE_DEFAULT_PORT,
        }
    }

    /// Interface name for a VNI, e.g. `vxlan100`
    pub fn interface_name(self, vni: Vni) -> String {
        format!("{}{}", self.kind(), vni)
    }
}

impl fmt::Display for TunnelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl FromStr for TunnelType {
    type Err = TunnelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vxlan" => Ok(TunnelType::Vxlan),
            "geneve" => Ok(TunnelType::Geneve),
            other => Err(TunnelError::invalid(
                "tunnel-type",
                format!("unsupported tunnel type '{}'", other),
            )),
        }
    }
}

/// Tool used to attach and detach bridge ports
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BridgeTool {
    #[default]
    Ip,
    Brctl,
}

impl fmt::Display for BridgeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeTool::Ip => f.write_str("ip"),
            BridgeTool::Brctl => f.write_str("brctl"),
        }
    }
}

/// One logical operation performed per invocation of the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Cleanup,
    List,
    Validate,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Cleanup => "cleanup",
            Action::List => "list",
            Action::Validate => "validate",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a bridge or device name against Linux interface naming rules
pub fn validate_ifname(field: &str, name: &str) -> TunnelResult<()> {
    if name.is_empty() {
        return Err(TunnelError::invalid(field, "must not be empty"));
    }
    if name.len() > IFNAME_MAX_LEN {
        return Err(TunnelError::invalid(
            field,
            format!("'{}' is longer than {} bytes", name, IFNAME_MAX_LEN),
        ));
    }
    if name == "." || name == ".." {
        return Err(TunnelError::invalid(field, format!("'{}' is reserved", name)));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == '/' || *c == ':')
    {
        return Err(TunnelError::invalid(
            field,
            format!("'{}' contains invalid character {:?}", name, c),
        ));
    }
    Ok(())
}

fn parse_host(field: &str, value: &str) -> TunnelResult<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| TunnelError::invalid(field, format!("'{}' is not an IP address", value)))
}

fn parse_endpoints(src: &str, dst: &str) -> TunnelResult<(IpAddr, IpAddr)> {
    let src_host = parse_host("src-host", src)?;
    let dst_host = parse_host("dst-host", dst)?;
    if src_host.is_ipv4() != dst_host.is_ipv4() {
        return Err(TunnelError::invalid(
            "dst-host",
            format!(
                "'{}' and src-host '{}' are different address families",
                dst_host, src_host
            ),
        ));
    }
    Ok((src_host, dst_host))
}

fn validate_port(field: &str, port: u16) -> TunnelResult<u16> {
    if port == 0 {
        return Err(TunnelError::invalid(field, "port 0 is not usable"));
    }
    Ok(port)
}

/// Parameters of a tunnel to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelParams {
    pub tunnel_type: TunnelType,
    pub vni: Vni,
    /// Local underlay endpoint
    pub src_host: IpAddr,
    /// Remote underlay endpoint
    pub dst_host: IpAddr,
    /// Existing bridge the tunnel is attached to
    pub bridge_name: String,
    pub src_port: u16,
    pub dst_port: u16,
    /// Parent device for the underlay
    pub dev: String,
}

impl TunnelParams {
    /// Validate the mandatory fields; ports and device take their defaults
    pub fn new(
        tunnel_type: TunnelType,
        vni: u32,
        src_host: &str,
        dst_host: &str,
        bridge_name: &str,
    ) -> TunnelResult<Self> {
        let vni = Vni::new(vni)?;
        let (src_host, dst_host) = parse_endpoints(src_host, dst_host)?;
        validate_ifname("bridge-name", bridge_name)?;

        Ok(Self {
            tunnel_type,
            vni,
            src_host,
            dst_host,
            bridge_name: bridge_name.to_string(),
            src_port: tunnel_type.default_port(),
            dst_port: tunnel_type.default_port(),
            dev: DEFAULT_DEV.to_string(),
        })
    }

    /// Set the UDP ports (builder pattern)
    pub fn with_ports(mut self, src_port: u16, dst_port: u16) -> TunnelResult<Self> {
        self.src_port = validate_port("src-port", src_port)?;
        self.dst_port = validate_port("dst-port", dst_port)?;
        Ok(self)
    }

    /// Set the parent device (builder pattern)
    pub fn with_dev(mut self, dev: &str) -> TunnelResult<Self> {
        validate_ifname("dev", dev)?;
        self.dev = dev.to_string();
        Ok(self)
    }

    pub fn interface_name(&self) -> String {
        self.tunnel_type.interface_name(self.vni)
    }
}

/// Tunnel to tear down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelTarget {
    pub tunnel_type: TunnelType,
    pub vni: Vni,
    pub bridge_name: String,
}

impl TunnelTarget {
    pub fn new(tunnel_type: TunnelType, vni: u32, bridge_name: &str) -> TunnelResult<Self> {
        let vni = Vni::new(vni)?;
        validate_ifname("bridge-name", bridge_name)?;
        Ok(Self {
            tunnel_type,
            vni,
            bridge_name: bridge_name.to_string(),
        })
    }

    pub fn interface_name(&self) -> String {
        self.tunnel_type.interface_name(self.vni)
    }
}

/// Connectivity check of an existing tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeParams {
    pub tunnel_type: TunnelType,
    pub vni: Vni,
    pub src_host: IpAddr,
    pub dst_host: IpAddr,
    pub timeout: Duration,
}

impl ProbeParams {
    pub fn new(
        tunnel_type: TunnelType,
        vni: u32,
        src_host: &str,
        dst_host: &str,
    ) -> TunnelResult<Self> {
        let vni = Vni::new(vni)?;
        let (src_host, dst_host) = parse_endpoints(src_host, dst_host)?;
        Ok(Self {
            tunnel_type,
            vni,
            src_host,
            dst_host,
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        })
    }

    /// Set the probe timeout (builder pattern)
    pub fn with_timeout_secs(mut self, secs: u64) -> TunnelResult<Self> {
        if secs == 0 || secs > MAX_PROBE_TIMEOUT_SECS {
            return Err(TunnelError::invalid(
                "timeout",
                format!("{} is out of range (1-{})", secs, MAX_PROBE_TIMEOUT_SECS),
            ));
        }
        self.timeout = Duration::from_secs(secs);
        Ok(self)
    }

    pub fn interface_name(&self) -> String {
        self.tunnel_type.interface_name(self.vni)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_params_defaults() {
        let params =
            TunnelParams::new(TunnelType::Vxlan, 100, "10.0.0.1", "10.0.0.2", "testBridge")
                .unwrap();

        assert_eq!(params.vni.get(), 100);
        assert_eq!(params.src_port, 4789);
        assert_eq!(params.dst_port, 4789);
        assert_eq!(params.dev, "eth0");
        assert_eq!(params.interface_name(), "vxlan100");
    }

    #[test]
    fn test_tunnel_params_geneve_defaults() {
        let params =
            TunnelParams::new(TunnelType::Geneve, 7, "10.0.0.1", "10.0.0.2", "br0").unwrap();
        assert_eq!(params.dst_port, 6081);
        assert_eq!(params.interface_name(), "geneve7");
    }

    #[test]
    fn test_tunnel_params_builder() {
        let params = TunnelParams::new(TunnelType::Vxlan, 42, "fd00::1", "fd00::2", "br0")
            .unwrap()
            .with_ports(5000, 8472)
            .unwrap()
            .with_dev("bond0")
            .unwrap();

        assert!(params.src_host.is_ipv6());
        assert_eq!(params.src_port, 5000);
        assert_eq!(params.dst_port, 8472);
        assert_eq!(params.dev, "bond0");
    }

    #[test]
    fn test_vni_bounds() {
        assert!(Vni::new(0).is_err());
        assert!(Vni::new(1).is_ok());
        assert!(Vni::new(VNI_MAX).is_ok());
        assert!(Vni::new(VNI_MAX + 1).is_err());
        assert_eq!(Vni::try_from(300).unwrap().to_string(), "300");
    }

    #[test]
    fn test_rejects_bad_hosts() {
        let err = TunnelParams::new(TunnelType::Vxlan, 1, "10.0.0.1; reboot", "10.0.0.2", "br0")
            .unwrap_err();
        assert!(err.to_string().contains("src-host"));

        let err =
            TunnelParams::new(TunnelType::Vxlan, 1, "10.0.0.1", "fd00::2", "br0").unwrap_err();
        assert!(err.to_string().contains("address families"));
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(TunnelParams::new(TunnelType::Vxlan, 1, "10.0.0.1", "10.0.0.2", "br 0").is_err());
        assert!(TunnelParams::new(TunnelType::Vxlan, 1, "10.0.0.1", "10.0.0.2", "").is_err());
        assert!(TunnelTarget::new(TunnelType::Vxlan, 1, "a-very-long-bridge-name").is_err());
        assert!(validate_ifname("dev", "..").is_err());
        assert!(validate_ifname("dev", "eth0/1").is_err());
        assert!(validate_ifname("dev", "eth0.100").is_ok());
    }

    #[test]
    fn test_rejects_zero_port() {
        let params =
            TunnelParams::new(TunnelType::Vxlan, 1, "10.0.0.1", "10.0.0.2", "br0").unwrap();
        assert!(params.with_ports(4789, 0).is_err());
    }

    #[test]
    fn test_tunnel_target() {
        let target = TunnelTarget::new(TunnelType::Vxlan, 100, "testBridge").unwrap();
        assert_eq!(target.interface_name(), "vxlan100");
        assert!(TunnelTarget::new(TunnelType::Vxlan, 0, "testBridge").is_err());
    }

    #[test]
    fn test_probe_params_timeout() {
        let probe = ProbeParams::new(TunnelType::Vxlan, 5, "10.0.0.1", "10.0.0.2").unwrap();
        assert_eq!(probe.timeout, Duration::from_secs(3));

        let probe = probe.with_timeout_secs(10).unwrap();
        assert_eq!(probe.timeout, Duration::from_secs(10));
        assert!(probe.clone().with_timeout_secs(0).is_err());
        assert!(probe.with_timeout_secs(61).is_err());
    }

    #[test]
    fn test_tunnel_type_parse() {
        assert_eq!("VXLAN".parse::<TunnelType>().unwrap(), TunnelType::Vxlan);
        assert_eq!("geneve".parse::<TunnelType>().unwrap(), TunnelType::Geneve);
        assert!("gre".parse::<TunnelType>().is_err());
        assert_eq!(TunnelType::Geneve.to_string(), "geneve");
    }
}
