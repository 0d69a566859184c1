//! JSON Export

use std::io::Write;

use anyhow::Result;

use super::ExportableRecord;
use crate::domain::ledger::TransactionRecord;

/// Write records as a pretty-printed JSON array
pub fn write_records<W: Write>(mut out: W, records: &[TransactionRecord]) -> Result<usize> {
    let exportable: Vec<ExportableRecord> = records.iter().map(ExportableRecord::from).collect();
    serde_json::to_writer_pretty(&mut out, &exportable)?;
    writeln!(out)?;
    Ok(records.len())
}
