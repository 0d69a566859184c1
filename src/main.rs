use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rampwatch::config::{self, Config};
use rampwatch::domain::ledger::{TransactionStore, TxHash, TxType};
use rampwatch::infrastructure::abi::AbiLoader;
use rampwatch::infrastructure::ethereum::{StatusPoller, ZkSyncStatusSource};
use rampwatch::infrastructure::runtime::{SyncScope, SyncWorker};
use rampwatch::modules::export::{self, OutputFormat};
use rampwatch::modules::toolkit;
use rampwatch::store::TransactionLedger;

#[derive(Debug, Parser)]
#[command(
    name = "rampwatch",
    version,
    about = "Decode Orchestrator calldata and keep the ramp transaction ledger in sync with zkSync"
)]
struct Args {
    /// zkSync JSON-RPC endpoint (e.g. https://sepolia.era.zksync.dev)
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// Ledger database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (defaults to ~/.config/rampwatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the 4-byte selector of a function signature
    Selector {
        signature: String,
        #[arg(long)]
        json: bool,
    },

    /// Decode calldata against the known ABIs, or an explicit signature
    Decode {
        calldata: String,
        signature: Option<String>,
        /// Print the decoded call as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode calldata from a signature and arguments
    Encode {
        signature: String,
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// Record a submitted transaction as pending
    Record {
        #[arg(long)]
        wallet: Address,
        #[arg(long)]
        hash: TxHash,
        #[arg(long = "type")]
        tx_type: TxType,
    },

    /// List pending transactions
    Pending {
        #[arg(long)]
        wallet: Option<Address>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Run one reconciliation sweep
    Sync {
        #[arg(long)]
        wallet: Option<Address>,
    },

    /// Reconcile periodically until Ctrl-C
    Watch {
        #[arg(long)]
        wallet: Option<Address>,
        /// Seconds between sweeps (overrides sync_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = config::load(args.config.clone())?;
    if let Some(rpc) = args.rpc.clone() {
        config.rpc_url = rpc;
    }
    if let Some(db) = args.db.clone() {
        config.database = Some(db);
    }

    match args.command {
        Command::Selector { signature, json } => {
            print_tool_result(&toolkit::selector::selector(&signature)?, json)?;
        }
        Command::Decode {
            calldata,
            signature,
            json,
        } => {
            let registry = AbiLoader::build_registry(&config.abi_roots())?;
            let call = toolkit::decode::decode(&registry, &calldata, signature.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&call)?);
            } else {
                print!("{}", toolkit::decode::to_tool_result(&call).render());
            }
        }
        Command::Encode {
            signature,
            args,
            json,
        } => {
            print_tool_result(&toolkit::encode::encode(&signature, &args)?, json)?;
        }
        Command::Record {
            wallet,
            hash,
            tx_type,
        } => {
            let ledger = open_ledger(&config)?;
            let record = ledger.insert_transaction(wallet, hash, tx_type)?;
            println!(
                "recorded #{} {} {} ({})",
                record.id, record.transaction_type, record.transaction_hash, record.transaction_status
            );
        }
        Command::Pending { wallet, format } => {
            let ledger = open_ledger(&config)?;
            let records = match wallet {
                Some(wallet) => ledger.get_pending_records_for_wallet(wallet)?,
                None => ledger.get_pending_records()?,
            };
            export::write_records(io::stdout().lock(), &records, format)?;
        }
        Command::Sync { wallet } => {
            let ledger = open_ledger(&config)?;
            let worker = build_worker(&config)?;
            let report = worker.sync_once(&ledger, scope(wallet)).await?;
            println!("checked {}, updated {}", report.checked, report.updated);
        }
        Command::Watch { wallet, interval } => {
            let ledger = open_ledger(&config)?;
            let worker = build_worker(&config)?;
            let period = interval
                .map(|secs| std::time::Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.sync_interval());

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown requested");
                    let _ = shutdown_tx.send(true);
                }
            });

            worker.run(&ledger, scope(wallet), period, shutdown_rx).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` directives when present and valid, `info` otherwise
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn print_tool_result(result: &toolkit::ToolResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else {
        print!("{}", result.render());
    }
    Ok(())
}

fn open_ledger(config: &Config) -> Result<TransactionLedger> {
    let path = config
        .database_path()
        .context("no ledger path: pass --db or set `database` in the config")?;
    TransactionLedger::open(&path)
}

fn build_worker(config: &Config) -> Result<SyncWorker> {
    let source = ZkSyncStatusSource::connect_http(&config.rpc_url)?;
    let poller = StatusPoller::new(
        Arc::new(source),
        config.request_timeout(),
        config.max_concurrent_lookups,
    );
    Ok(SyncWorker::new(poller, config.failure_policy()))
}

fn scope(wallet: Option<Address>) -> SyncScope {
    wallet.map_or(SyncScope::All, SyncScope::Wallet)
}
