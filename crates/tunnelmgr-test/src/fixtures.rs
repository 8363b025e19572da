//! Test fixtures for tunnel scenarios
//!
//! Provides canonical endpoints and builders for `ip -d link show` output

/// Canonical local endpoint
pub const SRC_HOST: &str = "10.0.0.1";
/// Canonical remote endpoint
pub const DST_HOST: &str = "10.0.0.2";
pub const SRC_HOST_V6: &str = "fd00::1";
pub const DST_HOST_V6: &str = "fd00::2";
/// Canonical bridge
pub const BRIDGE: &str = "testBridge";
pub const VNI: u32 = 100;
pub const DEV: &str = "eth0";

/// Error text the kernel reports when a link already exists
pub const LINK_EXISTS_STDERR: &str = "RTNETLINK answers: File exists\n";
/// Error text when a device is missing
pub const NO_DEVICE_STDERR: &str = "Cannot find device \"vxlan100\"\n";

/// A tunnel link as it appears in detailed link output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFixture {
    /// Link index
    pub index: u32,
    /// `vxlan` or `geneve`
    pub kind: String,
    pub vni: u32,
    pub local: Option<String>,
    pub remote: Option<String>,
    pub dev: Option<String>,
    pub dst_port: u16,
    pub master: Option<String>,
    pub up: bool,
}

impl LinkFixture {
    /// VXLAN link on the canonical endpoints, up and enslaved to the canonical bridge
    pub fn vxlan(index: u32, vni: u32) -> Self {
        Self {
            index,
            kind: "vxlan".to_string(),
            vni,
            local: Some(SRC_HOST.to_string()),
            remote: Some(DST_HOST.to_string()),
            dev: Some(DEV.to_string()),
            dst_port: 4789,
            master: Some(BRIDGE.to_string()),
            up: true,
        }
    }

    /// GENEVE link; the kernel reports neither local address nor device
    pub fn geneve(index: u32, vni: u32) -> Self {
        Self {
            index,
            kind: "geneve".to_string(),
            vni,
            local: None,
            remote: Some(DST_HOST.to_string()),
            dev: None,
            dst_port: 6081,
            master: Some(BRIDGE.to_string()),
            up: true,
        }
    }

    pub fn with_master(mut self, master: Option<&str>) -> Self {
        self.master = master.map(str::to_string);
        self
    }

    pub fn with_endpoints(mut self, local: &str, remote: &str) -> Self {
        self.local = Some(local.to_string());
        self.remote = Some(remote.to_string());
        self
    }

    pub fn with_dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn down(mut self) -> Self {
        self.up = false;
        self
    }

    pub fn ifname(&self) -> String {
        format!("{}{}", self.kind, self.vni)
    }

    /// Render the link the way `ip -d link show` prints it
    pub fn render(&self) -> String {
        let flags = if self.up {
            "BROADCAST,MULTICAST,UP,LOWER_UP"
        } else {
            "BROADCAST,MULTICAST"
        };
        let master = self
            .master
            .as_ref()
            .map(|m| format!(" master {}", m))
            .unwrap_or_default();
        let state = if self.up { "UNKNOWN" } else { "DOWN" };

        let mut detail = format!("{} id {}", self.kind, self.vni);
        if let Some(remote) = &self.remote {
            detail.push_str(&format!(" remote {}", remote));
        }
        if let Some(local) = &self.local {
            detail.push_str(&format!(" local {}", local));
        }
        if let Some(dev) = &self.dev {
            detail.push_str(&format!(" dev {}", dev));
        }
        detail.push_str(&format!(" srcport 0 0 dstport {} ttl auto ageing 300", self.dst_port));

        format!(
            "{}: {}: <{}> mtu 1450 qdisc noqueue{} state {} mode DEFAULT group default qlen 1000\n    \
             link/ether 3a:1c:5e:7d:90:{:02x} brd ff:ff:ff:ff:ff:ff promiscuity 1 minmtu 68 maxmtu 65535\n    \
             {}\n",
            self.index,
            self.ifname(),
            flags,
            master,
            state,
            self.index % 256,
            detail
        )
    }
}

/// Concatenate links into one listing
pub fn link_listing(links: &[LinkFixture]) -> String {
    links.iter().map(LinkFixture::render).collect()
}

/// Two VXLAN links: vxlan100 enslaved and up, vxlan200 detached and down
pub fn sample_vxlan_listing() -> String {
    link_listing(&[
        LinkFixture::vxlan(7, 100),
        LinkFixture::vxlan(8, 200)
            .with_endpoints(SRC_HOST_V6, DST_HOST_V6)
            .with_dst_port(8472)
            .with_master(None)
            .down(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vxlan_fixture_render() {
        let out = LinkFixture::vxlan(7, 100).render();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("7: vxlan100: <BROADCAST,MULTICAST,UP,LOWER_UP>"));
        assert!(lines[0].contains(" master testBridge state UNKNOWN "));
        assert_eq!(
            lines[2].trim(),
            "vxlan id 100 remote 10.0.0.2 local 10.0.0.1 dev eth0 srcport 0 0 dstport 4789 ttl auto ageing 300"
        );
    }

    #[test]
    fn test_geneve_fixture_render() {
        let out = LinkFixture::geneve(3, 7).with_master(None).down().render();
        assert!(out.starts_with("3: geneve7: <BROADCAST,MULTICAST> mtu 1450 qdisc noqueue state DOWN"));
        assert!(out.contains("geneve id 7 remote 10.0.0.2 srcport 0 0 dstport 6081"));
    }

    #[test]
    fn test_sample_listing() {
        let listing = sample_vxlan_listing();
        assert_eq!(listing.lines().count(), 6);
        assert!(listing.contains("vxlan200"));
    }
}
