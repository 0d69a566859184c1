//! Export Module
//!
//! Renders ledger records as a table, CSV or JSON on any writer.

mod csv_export;
mod json_export;

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use crate::domain::ledger::TransactionRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Exportable record: addresses checksummed, timestamps RFC 3339
#[derive(Debug, Serialize)]
pub(crate) struct ExportableRecord {
    id: i64,
    wallet_address: String,
    transaction_hash: String,
    transaction_type: String,
    transaction_status: String,
    created_at: String,
}

impl From<&TransactionRecord> for ExportableRecord {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: record.id,
            wallet_address: record.wallet_address.to_checksum(None),
            transaction_hash: record.transaction_hash.to_string(),
            transaction_type: record.transaction_type.to_string(),
            transaction_status: record.transaction_status.to_string(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Write `records` in `format`; returns the number of records written
pub fn write_records<W: Write>(
    out: W,
    records: &[TransactionRecord],
    format: OutputFormat,
) -> Result<usize> {
    match format {
        OutputFormat::Table => write_table(out, records),
        OutputFormat::Json => json_export::write_records(out, records),
        OutputFormat::Csv => csv_export::write_records(out, records),
    }
}

fn write_table<W: Write>(mut out: W, records: &[TransactionRecord]) -> Result<usize> {
    if records.is_empty() {
        writeln!(out, "no pending transactions")?;
        return Ok(0);
    }

    writeln!(
        out,
        "{:>5}  {:<42}  {:<66}  {:<8}  {:<7}  {}",
        "id", "wallet", "hash", "type", "status", "created"
    )?;
    for record in records {
        writeln!(
            out,
            "{:>5}  {:<42}  {:<66}  {:<8}  {:<7}  {}",
            record.id,
            record.wallet_address.to_checksum(None),
            record.transaction_hash,
            record.transaction_type,
            record.transaction_status,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
        )?;
    }
    Ok(records.len())
}
