//! Text renderings of [`MetadataRecord`]s for the presentation and export
//! layers.

use serde_json::ser::{PrettyFormatter, Serializer};
use serde::Serialize;
use crate::core::error::MetadataError;
use crate::core::metadata::MetadataRecord;

pub const DOCUMENT_SEPARATOR: &str = "---";

/// One `key: value` line per field, details last.
pub fn render_lines(record: &MetadataRecord) -> String {
    let mut lines: Vec<String> = record
        .fields
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    if let Some(details) = &record.details {
        lines.extend(details.iter().map(|(key, value)| format!("{key}: {value}")));
    }
    lines.join("\n")
}

/// All records as one plain-text document, entries separated by a `---`
/// line. The layout resembles YAML but values are written verbatim, never
/// quoted or escaped, so it is meant for reading rather than re-parsing.
/// A multi-line value follows `key: |`, one indented line per `\n`-separated
/// line of the value (blank lines kept, unindented).
pub fn export_document(records: &[MetadataRecord]) -> String {
    let mut out = String::new();
    for (idx, record) in records.iter().enumerate() {
        if idx > 0 {
            out.push_str(DOCUMENT_SEPARATOR);
            out.push('\n');
        }
        for (key, value) in record.fields.iter() {
            write_entry(&mut out, key, value, "");
        }
        if let Some(details) = &record.details {
            out.push_str("details:\n");
            for (key, value) in details.iter() {
                write_entry(&mut out, key, value, "  ");
            }
        }
    }
    out
}

fn write_entry(out: &mut String, key: &str, value: &str, indent: &str) {
    if value.contains('\n') {
        out.push_str(&format!("{indent}{key}: |\n"));
        for line in value.split('\n') {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push_str(&format!("{indent}  {line}\n"));
            }
        }
    } else {
        out.push_str(&format!("{indent}{key}: {value}\n"));
    }
}

/// JSON array of records, field order preserved, four-space indent.
pub fn export_json(records: &[MetadataRecord]) -> Result<String, MetadataError> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
