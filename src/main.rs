use clap::Parser;
use miette::{IntoDiagnostic, Result};
use peerpay::application::wallet::WalletService;
use peerpay::domain::account::Balance;
use peerpay::domain::ports::{AccountStore, AccountStoreRef, TransactionStoreRef};
use peerpay::error::WalletError;
use peerpay::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransactionStore};
#[cfg(feature = "storage-rocksdb")]
use peerpay::infrastructure::rocksdb::RocksDBStore;
use peerpay::interfaces::csv::account_writer::AccountWriter;
use peerpay::interfaces::csv::operation_reader::{
    OperationKind, OperationRecord, OperationReader,
};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let (accounts, transactions): (AccountStoreRef, TransactionStoreRef) = match cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            (Arc::new(store.clone()), Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            return Err(miette::miette!(
                "rebuild with --features storage-rocksdb to use --db-path"
            ));
        }
        None => (
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryTransactionStore::new()),
        ),
    };

    let service = WalletService::new(accounts.clone(), transactions);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for (row, op_result) in reader.operations().enumerate() {
        match op_result {
            Ok(record) => {
                if let Err(e) = apply(&service, &accounts, record).await {
                    warn!(row = row + 1, reason = %e, "operation skipped");
                }
            }
            Err(e) => {
                warn!(row = row + 1, reason = %e, "unreadable row skipped");
            }
        }
    }

    let report = service.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(&report).into_diagnostic()?;

    Ok(())
}

async fn apply(
    service: &WalletService,
    accounts: &AccountStoreRef,
    record: OperationRecord,
) -> peerpay::error::Result<()> {
    match record.op {
        OperationKind::Register => {
            let username = required(record.counterparty, "counterparty (username)")?;
            let secret = required(record.secret, "secret")?;
            service
                .register(&record.actor, &username, secret.into_bytes())
                .await?;
        }
        // Fixture op of the batch driver: funds an account directly through
        // the store so transfer scenarios have something to move.
        OperationKind::Seed => {
            let amount = required(record.amount, "amount")?;
            accounts
                .set_balance(&record.actor, Balance::new(amount))
                .await?;
        }
        OperationKind::Transfer => {
            let recipient = required(record.counterparty, "counterparty")?;
            let amount = required(record.amount, "amount")?;
            let id = record.id.unwrap_or_else(Uuid::new_v4);
            service
                .transfer(&record.actor, &recipient, amount, id)
                .await?;
        }
        OperationKind::Request => {
            let donor = required(record.counterparty, "counterparty")?;
            let amount = required(record.amount, "amount")?;
            let id = record.id.unwrap_or_else(Uuid::new_v4);
            service
                .request_money(&record.actor, &donor, amount, id)
                .await?;
        }
        OperationKind::Approve => {
            let id = required(record.id, "id")?;
            service.approve(&record.actor, id).await?;
        }
        OperationKind::Decline => {
            let id = required(record.id, "id")?;
            service.decline(&record.actor, id).await?;
        }
    }
    Ok(())
}

fn required<T>(value: Option<T>, field: &str) -> peerpay::error::Result<T> {
    value.ok_or_else(|| WalletError::Validation(format!("{field} is required")))
}
