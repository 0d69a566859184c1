//! CSV Export

use std::io::Write;

use anyhow::Result;

use super::ExportableRecord;
use crate::domain::ledger::TransactionRecord;

/// Write records as CSV with a header row
pub fn write_records<W: Write>(out: W, records: &[TransactionRecord]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(out);

    // serialize() only emits the header alongside the first row
    if records.is_empty() {
        wtr.write_record([
            "id",
            "wallet_address",
            "transaction_hash",
            "transaction_type",
            "transaction_status",
            "created_at",
        ])?;
    }
    for record in records {
        wtr.serialize(ExportableRecord::from(record))?;
    }

    wtr.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::export::tests::sample;

    #[test]
    fn test_csv_output() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "id,wallet_address,transaction_hash,transaction_type,transaction_status,created_at"
        );
        assert_eq!(
            lines[1],
            format!(
                "3,0x95bD8D42f30351685e96C62EDdc0d0613bf9a87A,0x{},offramp,pending,2024-05-14T09:12:44+00:00",
                "ab".repeat(32)
            )
        );
    }

    #[test]
    fn test_csv_header_without_rows() {
        let mut buf = Vec::new();
        assert_eq!(write_records(&mut buf, &[]).unwrap(), 0);
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
