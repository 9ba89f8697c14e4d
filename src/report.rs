//! Key table listings.
//!
//! Pure functions: (KeyTable, OutputFormat) → String. No I/O.

use serde::Serialize;

use crate::error::Result;
use crate::keymap::{Convention, KeyTable};
use crate::keys::Key;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Human,
    /// Machine-readable JSON.
    Json,
}

/// Serializable view of a key table.
#[derive(Debug, Serialize)]
pub struct TableReport {
    pub convention: String,
    pub entries: Vec<TableEntry>,
}

#[derive(Debug, Serialize)]
pub struct TableEntry {
    /// Space-separated lowercase hex, e.g. `"1b 5b 41"`.
    pub bytes: String,
    pub key: Key,
}

impl TableReport {
    pub fn new(convention: Convention, table: &KeyTable) -> Self {
        let entries = table
            .entries()
            .into_iter()
            .map(|(bytes, key)| TableEntry { bytes: hex(&bytes), key })
            .collect();
        TableReport {
            convention: convention.to_string(),
            entries,
        }
    }
}

/// Format the table of `convention`.
pub fn format_table(convention: Convention, format: OutputFormat) -> Result<String> {
    let report = TableReport::new(convention, &KeyTable::for_convention(convention));
    match format {
        OutputFormat::Human => Ok(format_human(&report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
    }
}

/// Lowercase hex bytes separated by spaces.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// HUMAN FORMAT
// ============================================================================

fn format_human(report: &TableReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} key table ===\n", report.convention));
    for entry in &report.entries {
        out.push_str(&format!("  {:<12} {}\n", entry.bytes, entry.key));
    }
    out.push('\n');

    let multi_byte = report.entries.iter().filter(|e| e.bytes.contains(' ')).count();
    out.push_str("=== Summary ===\n");
    out.push_str(&format!("Entries:     {}\n", report.entries.len()));
    out.push_str(&format!("Single byte: {}\n", report.entries.len() - multi_byte));
    out.push_str(&format!("Sequences:   {}\n", multi_byte));

    out
}

// ============================================================================
// TESTS
// ============================================================================
