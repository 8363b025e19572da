//! Rendering of tunnel listings

use clap::ValueEnum;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use tunnelmgr_common::{TunnelError, TunnelResult};

use crate::inventory::{Field, Listing, TunnelRecord};

/// Output format of `list`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Xml,
    Csv,
    Script,
    /// Tool output as-is
    Raw,
}

/// One record restricted to the selected fields, in selection order
struct RecordView<'a> {
    record: &'a TunnelRecord,
    fields: &'a [Field],
}

impl Serialize for RecordView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for &field in self.fields {
            match field {
                Field::Vni => map.serialize_entry(field.as_str(), &self.record.vni)?,
                Field::DstPort => map.serialize_entry(field.as_str(), &self.record.dst_port)?,
                _ => map.serialize_entry(field.as_str(), &self.record.field(field))?,
            }
        }
        map.end()
    }
}

struct RecordsView<'a> {
    records: &'a [TunnelRecord],
    fields: &'a [Field],
}

impl Serialize for RecordsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in self.records {
            seq.serialize_element(&RecordView {
                record,
                fields: self.fields,
            })?;
        }
        seq.end()
    }
}

/// Render a listing in the requested format
///
/// `fields` must be non-empty unless the format is [`OutputFormat::Raw`],
/// which ignores field selection.
pub fn render(listing: &Listing, format: OutputFormat, fields: &[Field]) -> TunnelResult<String> {
    if format != OutputFormat::Raw && fields.is_empty() {
        return Err(TunnelError::format("no fields selected"));
    }

    let records = listing.records.as_slice();
    let view = RecordsView { records, fields };

    match format {
        OutputFormat::Raw => Ok(listing.raw.clone()),
        OutputFormat::Json => serde_json::to_string_pretty(&view)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| TunnelError::format(format!("JSON serialization failed: {}", e))),
        OutputFormat::Yaml => {
            if records.is_empty() {
                return Ok("[]\n".to_string());
            }
            serde_yaml::to_string(&view)
                .map_err(|e| TunnelError::format(format!("YAML serialization failed: {}", e)))
        }
        OutputFormat::Xml => Ok(render_xml(records, fields)),
        OutputFormat::Csv => Ok(render_csv(records, fields)),
        OutputFormat::Script => Ok(render_script(records, fields)),
        OutputFormat::Table => Ok(render_table(records, fields)),
    }
}

fn cell(record: &TunnelRecord, field: Field) -> String {
    record.field(field).unwrap_or_default()
}

fn table_line(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{:^w$}", c, w = w))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn render_table(records: &[TunnelRecord], fields: &[Field]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| fields.iter().map(|&f| cell(r, f)).collect())
        .collect();
    let widths: Vec<usize> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(f.as_str().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
    let mut out = String::new();
    out.push_str(table_line(&header, &widths).trim_end());
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(table_line(&cells, &widths).trim_end());
        out.push('\n');
    }
    out
}

fn csv_escape(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_csv(records: &[TunnelRecord], fields: &[Field]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut out = fields.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(",");
    out.push_str("\r\n");
    for record in records {
        let row: Vec<String> = fields.iter().map(|&f| csv_escape(&cell(record, f))).collect();
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_xml(records: &[TunnelRecord], fields: &[Field]) -> String {
    let mut out = String::from("<TunnelInterfaces>");
    for record in records {
        out.push_str("<Interface>");
        for &field in fields {
            let name = field.as_str();
            out.push_str(&format!(
                "<{}>{}</{}>",
                name,
                xml_escape(&cell(record, field)),
                name
            ));
        }
        out.push_str("</Interface>");
    }
    out.push_str("</TunnelInterfaces>\n");
    out
}

fn render_script(records: &[TunnelRecord], fields: &[Field]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = records
        .iter()
        .flat_map(|r| {
            fields
                .iter()
                .map(move |&f| format!("{}: {}", f.as_str(), cell(r, f)))
        })
        .collect();
    format!("{}\n", pairs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn listing() -> Listing {
        Listing {
            raw: "raw tool output\n".to_string(),
            records: vec![
                TunnelRecord {
                    ifname: "vxlan100".to_string(),
                    vni: Some(100),
                    src_host: Some("10.0.0.1".to_string()),
                    dst_host: Some("10.0.0.2".to_string()),
                    dst_port: Some(4789),
                    dev: Some("eth0".to_string()),
                    bridge: Some("testBridge".to_string()),
                    state: Some("UNKNOWN".to_string()),
                },
                TunnelRecord {
                    ifname: "vxlan7".to_string(),
                    vni: Some(7),
                    ..Default::default()
                },
            ],
        }
    }

    const NAME_VNI: [Field; 2] = [Field::Ifname, Field::Vni];

    #[test]
    fn test_render_table() {
        let out = render(&listing(), OutputFormat::Table, &NAME_VNI).unwrap();
        assert_eq!(
            out,
            " ifname  | vni\n---------+----\nvxlan100 | 100\n vxlan7  |  7\n"
        );
    }

    #[test]
    fn test_render_json_keeps_field_order() {
        let fields = [Field::Vni, Field::Ifname, Field::Bridge];
        let out = render(&listing(), OutputFormat::Json, &fields).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value[0]["vni"], 100);
        assert_eq!(value[0]["bridge"], "testBridge");
        assert!(value[1]["bridge"].is_null());
        assert!(out.find("\"vni\"").unwrap() < out.find("\"ifname\"").unwrap());
    }

    #[test]
    fn test_render_yaml() {
        let out = render(&listing(), OutputFormat::Yaml, &NAME_VNI).unwrap();
        assert_eq!(out, "- ifname: vxlan100\n  vni: 100\n- ifname: vxlan7\n  vni: 7\n");
    }

    #[test]
    fn test_render_xml() {
        let out = render(&listing(), OutputFormat::Xml, &NAME_VNI).unwrap();
        assert_eq!(
            out,
            "<TunnelInterfaces><Interface><ifname>vxlan100</ifname><vni>100</vni></Interface>\
             <Interface><ifname>vxlan7</ifname><vni>7</vni></Interface></TunnelInterfaces>\n"
        );
        assert_eq!(xml_escape("a<b&\"c\""), "a&lt;b&amp;&quot;c&quot;");
    }

    #[test]
    fn test_render_csv() {
        let out = render(&listing(), OutputFormat::Csv, &NAME_VNI).unwrap();
        assert_eq!(out, "ifname,vni\r\nvxlan100,100\r\nvxlan7,7\r\n");
        assert_eq!(csv_escape("a,\"b\""), "\"a,\"\"b\"\"\"");
    }

    #[test]
    fn test_render_script() {
        let out = render(&listing(), OutputFormat::Script, &NAME_VNI).unwrap();
        assert_eq!(out, "ifname: vxlan100, vni: 100, ifname: vxlan7, vni: 7\n");
    }

    #[test]
    fn test_render_raw_is_unmodified() {
        let out = render(&listing(), OutputFormat::Raw, &[]).unwrap();
        assert_eq!(out, "raw tool output\n");
    }

    #[test]
    fn test_render_empty_listing() {
        let empty = Listing::default();
        assert_eq!(render(&empty, OutputFormat::Table, &NAME_VNI).unwrap(), "");
        assert_eq!(render(&empty, OutputFormat::Csv, &NAME_VNI).unwrap(), "");
        assert_eq!(render(&empty, OutputFormat::Script, &NAME_VNI).unwrap(), "");
        assert_eq!(render(&empty, OutputFormat::Json, &NAME_VNI).unwrap(), "[]\n");
        assert_eq!(render(&empty, OutputFormat::Yaml, &NAME_VNI).unwrap(), "[]\n");
        assert_eq!(
            render(&empty, OutputFormat::Xml, &NAME_VNI).unwrap(),
            "<TunnelInterfaces></TunnelInterfaces>\n"
        );
    }

    #[test]
    fn test_render_requires_fields() {
        assert!(render(&listing(), OutputFormat::Json, &[]).is_err());
    }
}
