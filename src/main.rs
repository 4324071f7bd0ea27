use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paysim::application::config::EngineConfig;
use paysim::application::engine::PaymentEngine;
use paysim::application::retry::{Backoff, RetryPolicy};
use paysim::domain::ports::{AccountStore, LedgerRef};
use paysim::error::PaymentError;
use paysim::infrastructure::in_memory::InMemoryLedger;
use paysim::infrastructure::receiver::LedgerReceiver;
#[cfg(feature = "storage-rocksdb")]
use paysim::infrastructure::rocksdb::RocksDBStore;
use paysim::interfaces::csv::account_reader::AccountReader;
use paysim::interfaces::csv::account_writer::AccountWriter;
use paysim::interfaces::csv::payment_reader::PaymentRequestReader;
use paysim::interfaces::csv::payment_writer::PaymentWriter;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment requests CSV file (type, account, amount, counterparty, idempotency_key)
    input: PathBuf,

    /// Seed accounts CSV file (tax_id, name, balance)
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Write the final account balances to this CSV file
    #[arg(long)]
    balances: Option<PathBuf>,

    /// Attempts per storage step before a write conflict is reported
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Linear backoff step between conflicting attempts, in milliseconds
    #[arg(long, default_value_t = 30)]
    backoff_ms: u64,

    /// Timeout for a single call to the receiving party, in milliseconds
    #[arg(long, default_value_t = 5000)]
    receiver_timeout_ms: u64,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff: Backoff::Linear(Duration::from_millis(self.backoff_ms)),
            },
            receiver_timeout: Duration::from_millis(self.receiver_timeout_ms),
            ..EngineConfig::default()
        }
    }
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedger::new()))
        }
        None => Ok(Arc::new(InMemoryLedger::new())),
    }
}

async fn seed_accounts(ledger: &LedgerRef, path: PathBuf) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    for account in AccountReader::new(file).accounts() {
        match account {
            Ok(account) => match ledger.create(account).await {
                Ok(created) => debug!(id = created.id, tax_id = %created.tax_id, "account seeded"),
                Err(PaymentError::DuplicateAccount(tax_id)) => {
                    info!("Account {} already exists, keeping stored state", tax_id);
                }
                Err(e) => return Err(e).into_diagnostic(),
            },
            Err(e) => error!("Error reading account: {}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config();

    let ledger = open_ledger(cli.db_path)?;
    if let Some(path) = cli.accounts {
        seed_accounts(&ledger, path).await?;
    }

    let receiver = Arc::new(LedgerReceiver::new(ledger.clone(), config.retry));
    let engine = PaymentEngine::new(ledger, receiver).with_config(config);

    // Process payments
    let file = File::open(cli.input).into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    for request in PaymentRequestReader::new(file).requests() {
        match request {
            Ok(request) => match engine.create_and_process(request).await {
                Ok(response) => writer.write(&response).into_diagnostic()?,
                Err(e) => error!("Error processing payment: {}", e),
            },
            Err(e) => error!("Error reading payment request: {}", e),
        }
    }

    if let Some(path) = cli.balances {
        let file = File::create(path).into_diagnostic()?;
        AccountWriter::new(file)
            .write_accounts(engine.accounts().await.into_diagnostic()?)
            .into_diagnostic()?;
    }

    Ok(())
}
