//! Parsing of `ip -d link show type <kind>` output
//!
//! Each link is a header line (`5: vxlan100: <...> mtu 1450 ... master br0 state UNKNOWN ...`)
//! followed by indented detail lines; the one starting with the link kind
//! carries the tunnel attributes (`vxlan id 100 remote 10.0.0.2 local 10.0.0.1 dev eth0 ... dstport 4789 ...`).

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tunnelmgr_common::{TunnelError, TunnelResult};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+:\s+([^:\s]+):\s+<[^>]*>(.*)$").expect("Invalid regex pattern")
});
static DETAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:vxlan|geneve)\s+id\s+(\d+)\b").expect("Invalid regex pattern"));
static MASTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bmaster\s+(\S+)").expect("Invalid regex pattern"));
static STATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstate\s+(\S+)").expect("Invalid regex pattern"));
static REMOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bremote\s+(\S+)").expect("Invalid regex pattern"));
static LOCAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\blocal\s+(\S+)").expect("Invalid regex pattern"));
static DEV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdev\s+(\S+)").expect("Invalid regex pattern"));
static DSTPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdstport\s+(\d+)").expect("Invalid regex pattern"));

/// Columns a listing can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Ifname,
    Vni,
    SrcHost,
    DstHost,
    DstPort,
    Dev,
    Bridge,
    State,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Ifname,
        Field::Vni,
        Field::SrcHost,
        Field::DstHost,
        Field::DstPort,
        Field::Dev,
        Field::Bridge,
        Field::State,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Ifname => "ifname",
            Field::Vni => "vni",
            Field::SrcHost => "src_host",
            Field::DstHost => "dst_host",
            Field::DstPort => "dst_port",
            Field::Dev => "dev",
            Field::Bridge => "bridge",
            Field::State => "state",
        }
    }

    /// Resolve `--fields` values; empty or `all` selects every field
    pub fn select<S: AsRef<str>>(names: &[S]) -> TunnelResult<Vec<Field>> {
        if names.is_empty() || names.iter().any(|n| n.as_ref() == "all") {
            return Ok(Field::ALL.to_vec());
        }

        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let field = name.as_ref().parse()?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Ok(fields)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = TunnelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
                TunnelError::invalid(
                    "fields",
                    format!("unknown field '{}' (expected one of: all, {})", s, known.join(", ")),
                )
            })
    }
}

/// A tunnel link as reported by the kernel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelRecord {
    pub ifname: String,
    pub vni: Option<u32>,
    pub src_host: Option<String>,
    pub dst_host: Option<String>,
    pub dst_port: Option<u16>,
    pub dev: Option<String>,
    pub bridge: Option<String>,
    pub state: Option<String>,
}

impl TunnelRecord {
    /// Text value of a field, `None` when the kernel did not report it
    pub fn field(&self, field: Field) -> Option<String> {
        match field {
            Field::Ifname => Some(self.ifname.clone()),
            Field::Vni => self.vni.map(|v| v.to_string()),
            Field::SrcHost => self.src_host.clone(),
            Field::DstHost => self.dst_host.clone(),
            Field::DstPort => self.dst_port.map(|p| p.to_string()),
            Field::Dev => self.dev.clone(),
            Field::Bridge => self.bridge.clone(),
            Field::State => self.state.clone(),
        }
    }

    fn apply_header(&mut self, rest: &str) {
        self.bridge = capture(&MASTER_RE, rest);
        self.state = capture(&STATE_RE, rest);
    }

    fn apply_detail(&mut self, line: &str, vni: &str) {
        self.vni = vni.parse().ok();
        self.dst_host = capture(&REMOTE_RE, line);
        self.src_host = capture(&LOCAL_RE, line);
        self.dev = capture(&DEV_RE, line);
        self.dst_port = capture(&DSTPORT_RE, line).and_then(|p| p.parse().ok());
    }
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse detailed link output into records, in kernel order
pub fn parse_links(output: &str) -> Vec<TunnelRecord> {
    let mut records = Vec::new();
    let mut current: Option<TunnelRecord> = None;

    for line in output.lines() {
        if let Some(caps) = HEADER_RE.captures(line) {
            if let Some(done) = current.take() {
                records.push(done);
            }
            // "vxlan100@eth0" names the parent after the '@'
            let name = caps.get(1).map_or("", |m| m.as_str());
            let ifname = name.split('@').next().unwrap_or(name);
            let mut record = TunnelRecord {
                ifname: ifname.to_string(),
                ..Default::default()
            };
            record.apply_header(caps.get(2).map_or("", |m| m.as_str()));
            current = Some(record);
            continue;
        }

        let trimmed = line.trim();
        if let (Some(record), Some(caps)) = (current.as_mut(), DETAIL_RE.captures(trimmed)) {
            let vni = caps.get(1).map_or("", |m| m.as_str());
            record.apply_detail(trimmed, vni);
        }
    }

    if let Some(done) = current {
        records.push(done);
    }
    records
}

/// Raw tool output together with its parsed records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub raw: String,
    pub records: Vec<TunnelRecord>,
}

impl Listing {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let records = parse_links(&raw);
        Self { raw, records }
    }
}
