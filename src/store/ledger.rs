//! SQLite-backed transaction ledger

use std::path::Path;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::ledger::{TransactionRecord, TransactionStore, TxHash, TxStatus, TxType};

const RECORD_COLUMNS: &str = "id, wallet_address, transaction_hash, transaction_type, \
                              transaction_status, created_at";

#[derive(Debug)]
pub struct TransactionLedger {
    conn: Connection,
}

impl TransactionLedger {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create data dir {}", parent.display()))?;
        }
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        let ledger = Self { conn };
        ledger.init()?;
        Ok(ledger)
    }

    pub fn open_in_memory() -> Result<Self> {
        let ledger = Self {
            conn: Connection::open_in_memory()?,
        };
        ledger.init()?;
        Ok(ledger)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS transactions (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                wallet_address     TEXT NOT NULL,
                transaction_hash   TEXT NOT NULL UNIQUE,
                transaction_type   TEXT NOT NULL
                    CHECK (transaction_type IN ('register', 'onramp', 'offramp')),
                transaction_status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (transaction_status IN ('pending', 'success', 'failed')),
                created_at         INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_status
                ON transactions(transaction_status);
            CREATE INDEX IF NOT EXISTS idx_transactions_wallet
                ON transactions(wallet_address, transaction_status);",
        )?;
        Ok(())
    }

    /// Record a new transaction as `pending`
    pub fn insert_transaction(
        &self,
        wallet: Address,
        hash: TxHash,
        tx_type: TxType,
    ) -> Result<TransactionRecord> {
        if self.get_by_hash(hash)?.is_some() {
            bail!("transaction {hash} is already recorded");
        }
        self.conn.execute(
            "INSERT INTO transactions(wallet_address, transaction_hash, transaction_type)
             VALUES (?1, ?2, ?3)",
            params![encode_address(wallet), encode_hash(hash), tx_type.as_str()],
        )?;

        self.get_by_hash(hash)?
            .with_context(|| format!("transaction {hash} missing after insert"))
    }

    pub fn get_by_hash(&self, hash: TxHash) -> Result<Option<TransactionRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM transactions WHERE transaction_hash = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_row(params![encode_hash(hash)], RawRecord::from_row)
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    fn query_records(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(args)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(RawRecord::from_row(row)?.into_record()?);
        }
        Ok(out)
    }
}

impl TransactionStore for TransactionLedger {
    fn get_pending_records(&self) -> Result<Vec<TransactionRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM transactions
             WHERE transaction_status = 'pending' ORDER BY id"
        );
        self.query_records(&sql, &[])
    }

    fn get_pending_records_for_wallet(&self, wallet: Address) -> Result<Vec<TransactionRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM transactions
             WHERE transaction_status = 'pending' AND wallet_address = ?1 ORDER BY id"
        );
        self.query_records(&sql, &[&encode_address(wallet)])
    }

    fn compare_and_set_status(&self, id: i64, expected: TxStatus, new: TxStatus) -> Result<bool> {
        if !expected.can_transition_to(new) {
            bail!("illegal status transition {expected} -> {new}");
        }
        let changed = self.conn.execute(
            "UPDATE transactions SET transaction_status = ?1
             WHERE id = ?2 AND transaction_status = ?3",
            params![new.as_str(), id, expected.as_str()],
        )?;
        Ok(changed == 1)
    }
}

/// Row as stored, before domain parsing
struct RawRecord {
    id: i64,
    wallet_address: String,
    transaction_hash: String,
    transaction_type: String,
    transaction_status: String,
    created_at: i64,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            wallet_address: row.get(1)?,
            transaction_hash: row.get(2)?,
            transaction_type: row.get(3)?,
            transaction_status: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<TransactionRecord> {
        let created_at = DateTime::<Utc>::from_timestamp(self.created_at, 0)
            .with_context(|| format!("row {}: bad created_at {}", self.id, self.created_at))?;
        Ok(TransactionRecord {
            id: self.id,
            wallet_address: self
                .wallet_address
                .parse()
                .with_context(|| format!("row {}: bad wallet address", self.id))?,
            transaction_hash: self
                .transaction_hash
                .parse()
                .with_context(|| format!("row {}: bad transaction hash", self.id))?,
            transaction_type: self.transaction_type.parse()?,
            transaction_status: self.transaction_status.parse()?,
            created_at,
        })
    }
}

fn encode_address(address: Address) -> String {
    format!("0x{}", hex::encode(address))
}

fn encode_hash(hash: TxHash) -> String {
    format!("0x{}", hex::encode(hash))
}
