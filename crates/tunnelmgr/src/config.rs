//! Configuration file support for tunnelmgr
//!
//! Loads and validates tunnelmgr configuration from TOML files.
//! Default location: /etc/tunnelmgr/tunnelmgr.toml

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tunnelmgr_common::{exec, TunnelError, TunnelResult};

use crate::commands::ToolPaths;
use crate::types::{
    validate_ifname, BridgeTool, TunnelType, DEFAULT_DEV, DEFAULT_PROBE_TIMEOUT_SECS,
    MAX_PROBE_TIMEOUT_SECS,
};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tunnelmgr/tunnelmgr.toml";

/// External programs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ip")]
    pub ip: String,

    #[serde(default = "default_brctl")]
    pub brctl: String,

    #[serde(default = "default_ping")]
    pub ping: String,

    /// Tool used for bridge attach/detach
    #[serde(default)]
    pub bridge_tool: BridgeTool,
}

/// Defaults for omitted command line options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub tunnel_type: TunnelType,

    /// Parent device for new tunnels
    #[serde(default = "default_dev")]
    pub dev: String,
}

/// Command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Per-command timeout in seconds
    #[serde(default = "default_exec_timeout")]
    pub timeout_secs: u64,
}

/// Connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

/// Logging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "tunnelmgr=debug"; RUST_LOG wins when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Complete tunnelmgr configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelMgrConfig {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub exec: ExecConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_ip() -> String {
    exec::IP_CMD.to_string()
}

fn default_brctl() -> String {
    exec::BRCTL_CMD.to_string()
}

fn default_ping() -> String {
    exec::PING_CMD.to_string()
}

fn default_dev() -> String {
    DEFAULT_DEV.to_string()
}

fn default_exec_timeout() -> u64 {
    exec::DEFAULT_TIMEOUT.as_secs()
}

fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            brctl: default_brctl(),
            ping: default_ping(),
            bridge_tool: BridgeTool::default(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            tunnel_type: TunnelType::default(),
            dev: default_dev(),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_exec_timeout(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout(),
        }
    }
}

impl TunnelMgrConfig {
    /// Load and validate a configuration file
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> TunnelResult<Option<Self>> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TunnelError::config(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let config: Self = toml::from_str(&content).map_err(|e| {
            TunnelError::config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> TunnelResult<Self> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> TunnelResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| TunnelError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content).map_err(|e| {
            TunnelError::config(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Get command timeout as Duration
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec.timeout_secs)
    }

    /// Get probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }

    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            ip: self.tools.ip.clone(),
            brctl: self.tools.brctl.clone(),
            ping: self.tools.ping.clone(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> TunnelResult<()> {
        for (name, value) in [
            ("tools.ip", &self.tools.ip),
            ("tools.brctl", &self.tools.brctl),
            ("tools.ping", &self.tools.ping),
        ] {
            if value.trim().is_empty() {
                return Err(TunnelError::config(format!("{} must not be empty", name)));
            }
        }

        validate_ifname("defaults.dev", &self.defaults.dev)
            .map_err(|e| TunnelError::config(e.to_string()))?;

        if self.exec.timeout_secs == 0 {
            return Err(TunnelError::config("exec.timeout_secs must be > 0"));
        }

        if self.probe.timeout_secs == 0 || self.probe.timeout_secs > MAX_PROBE_TIMEOUT_SECS {
            return Err(TunnelError::config(format!(
                "probe.timeout_secs must be 1-{}",
                MAX_PROBE_TIMEOUT_SECS
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = TunnelMgrConfig::default();
        assert_eq!(config.tools.ip, "ip");
        assert_eq!(config.tools.bridge_tool, BridgeTool::Ip);
        assert_eq!(config.defaults.tunnel_type, TunnelType::Vxlan);
        assert_eq!(config.defaults.dev, "eth0");
        assert_eq!(config.exec_timeout(), Duration::from_secs(30));
        assert_eq!(config.probe_timeout(), Duration::from_secs(3));
        assert!(config.logging.level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[tools]
ip = "/usr/sbin/ip"
bridge_tool = "brctl"

[defaults]
tunnel_type = "geneve"

[logging]
level = "debug"
"#;
        let config: TunnelMgrConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tools.ip, "/usr/sbin/ip");
        assert_eq!(config.tools.bridge_tool, BridgeTool::Brctl);
        assert_eq!(config.defaults.tunnel_type, TunnelType::Geneve);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        // Unspecified values should use defaults
        assert_eq!(config.tools.ping, "ping");
        assert_eq!(config.exec.timeout_secs, 30);
        assert_eq!(config.tool_paths().ip, "/usr/sbin/ip");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TunnelMgrConfig::default();
        config.exec.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = TunnelMgrConfig::default();
        config.probe.timeout_secs = 61;
        assert!(config.validate().is_err());

        let mut config = TunnelMgrConfig::default();
        config.tools.ping = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = TunnelMgrConfig::default();
        config.defaults.dev = "eth 0".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(TunnelMgrConfig::load("/nonexistent/tunnelmgr.toml")
            .unwrap()
            .is_none());
        let config = TunnelMgrConfig::load_or_default("/nonexistent/tunnelmgr.toml").unwrap();
        assert_eq!(config, TunnelMgrConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[exec]\ntimeout_secs = 5\n[probe]\ntimeout_secs = 10").unwrap();

        let config = TunnelMgrConfig::load(file.path()).unwrap().unwrap();
        assert_eq!(config.exec_timeout(), Duration::from_secs(5));
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[tools\nip = ").unwrap();

        let err = TunnelMgrConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[defaults]\ntunnel_type = \"gre\"").unwrap();
        assert!(TunnelMgrConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunnelmgr.toml");

        let mut config = TunnelMgrConfig::default();
        config.tools.bridge_tool = BridgeTool::Brctl;
        config.save(&path).unwrap();

        let loaded = TunnelMgrConfig::load(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }
}
