use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use tokio::sync::Mutex;

use crate::domain::account::{Account, AccountId, Amount, Balance, NewAccount};
use crate::domain::ports::{AccountStore, TransactionStore};
use crate::domain::transaction::{
    Transaction, TransactionFilter, TransactionId, TransactionStatus,
};
use crate::error::{Result, WalletError};

/// Column Family for account records, keyed by login.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for transaction records, keyed by uuid bytes.
pub const CF_TRANSACTIONS: &str = "transactions";

/// Persistent store backed by RocksDB, implementing both ports.
///
/// Values are JSON-encoded. A single async mutex serializes every
/// read-modify-write, so uniqueness checks and status transitions stay
/// atomic. That is all the concurrency a single-node ledger needs here;
/// reads go straight to the database.
///
/// `Clone` shares the underlying `Arc<DB>` and the mutex.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, ensuring both column
    /// families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_transactions])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            WalletError::Internal(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| WalletError::Internal(Box::new(e)))
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| WalletError::Internal(Box::new(e)))
    }

    fn read_account(&self, login: &str) -> Result<Option<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, login.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(CF_ACCOUNTS)?;
        self.db
            .put_cf(cf, account.login.as_bytes(), Self::encode(account)?)?;
        Ok(())
    }

    fn scan_accounts(&self) -> Result<Vec<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(Self::decode::<Account>(&value)?);
        }
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    fn read_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_transaction(&self, tx: &Transaction) -> Result<()> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        self.db
            .put_cf(cf, tx.id.as_bytes(), Self::encode(tx)?)?;
        Ok(())
    }

    async fn transition(
        &self,
        acting: &str,
        id: TransactionId,
        target: TransactionStatus,
    ) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .read_transaction(id)?
            .ok_or(WalletError::TransactionNotFound(id))?;
        if acting != tx.sender {
            return Err(WalletError::NotAuthorized {
                actor: acting.to_owned(),
                id,
            });
        }
        if tx.status != TransactionStatus::Pending {
            return Err(WalletError::InvalidState {
                id,
                status: tx.status,
            });
        }
        tx.status = target;
        self.put_transaction(&tx)?;
        Ok(tx)
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn create(&self, candidate: NewAccount) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        if self.read_account(&candidate.login)?.is_some() {
            return Err(WalletError::AccountExists(candidate.login));
        }
        let existing = self.scan_accounts()?;
        if existing.iter().any(|a| a.username == candidate.username) {
            return Err(WalletError::AccountExists(candidate.username));
        }
        // scan_accounts sorts by id, so the last entry carries the maximum.
        let id = existing.last().map_or(0, |a| a.id) + 1;
        let account = Account {
            id,
            login: candidate.login,
            username: candidate.username,
            password: candidate.password,
            balance: Balance::ZERO,
        };
        self.put_account(&account)?;
        Ok(account)
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Account> {
        self.scan_accounts()?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| WalletError::AccountNotFound(format!("id {id}")))
    }

    async fn get_by_login(&self, login: &str) -> Result<Account> {
        self.read_account(login)?
            .ok_or_else(|| WalletError::AccountNotFound(login.to_owned()))
    }

    async fn get_by_username(&self, username: &str) -> Result<Account> {
        self.scan_accounts()?
            .into_iter()
            .find(|a| a.username == username)
            .ok_or_else(|| WalletError::AccountNotFound(username.to_owned()))
    }

    async fn set_balance(&self, login: &str, balance: Balance) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        let mut account = self
            .read_account(login)?
            .ok_or_else(|| WalletError::AccountNotFound(login.to_owned()))?;
        account.balance = balance;
        self.put_account(&account)?;
        Ok(account)
    }

    async fn list(&self) -> Result<Vec<Account>> {
        self.scan_accounts()
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn create(
        &self,
        sender: &str,
        recipient: &str,
        amount: Amount,
        id: TransactionId,
    ) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        if self.read_transaction(id)?.is_some() {
            return Err(WalletError::TransactionExists(id));
        }
        let tx = Transaction {
            id,
            status: TransactionStatus::Pending,
            sender: sender.to_owned(),
            recipient: recipient.to_owned(),
            amount,
        };
        self.put_transaction(&tx)?;
        Ok(tx)
    }

    async fn get(&self, id: TransactionId) -> Result<Transaction> {
        self.read_transaction(id)?
            .ok_or(WalletError::TransactionNotFound(id))
    }

    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let mut matches = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let tx: Transaction = Self::decode(&value)?;
            if filter.matches(&tx) {
                matches.push(tx);
            }
        }
        Ok(matches)
    }

    async fn approve(&self, acting: &str, id: TransactionId) -> Result<Transaction> {
        self.transition(acting, id, TransactionStatus::Approved).await
    }

    async fn decline(&self, acting: &str, id: TransactionId) -> Result<Transaction> {
        self.transition(acting, id, TransactionStatus::Declined).await
    }

    async fn set_failed(&self, id: TransactionId) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .read_transaction(id)?
            .ok_or(WalletError::TransactionNotFound(id))?;
        tx.status = TransactionStatus::Failed;
        self.put_transaction(&tx)?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn candidate(login: &str, username: &str) -> NewAccount {
        NewAccount {
            login: login.to_owned(),
            username: username.to_owned(),
            password: b"hash".to_vec(),
        }
    }

    #[tokio::test]
    async fn open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("failed to open RocksDB");

        assert!(store.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(store.db.cf_handle(CF_TRANSACTIONS).is_some());
    }

    #[tokio::test]
    async fn account_round_trip_and_uniqueness() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let created = AccountStore::create(&store, candidate("a", "A")).await.unwrap();
        assert_eq!(created.id, 1);

        let fetched = store.get_by_login("a").await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(store.get_by_username("A").await.unwrap(), created);

        assert!(matches!(
            AccountStore::create(&store, candidate("a", "Other")).await,
            Err(WalletError::AccountExists(_))
        ));
        assert!(matches!(
            AccountStore::create(&store, candidate("other", "A")).await,
            Err(WalletError::AccountExists(_))
        ));
    }

    #[tokio::test]
    async fn balance_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            AccountStore::create(&store, candidate("a", "A")).await.unwrap();
            store
                .set_balance("a", Balance::new(dec!(42.5)))
                .await
                .unwrap();
        }
        let store = RocksDBStore::open(dir.path()).unwrap();
        let account = store.get_by_login("a").await.unwrap();
        assert_eq!(account.balance, Balance::new(dec!(42.5)));
    }

    #[tokio::test]
    async fn transaction_transitions_are_guarded() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let id = Uuid::new_v4();

        TransactionStore::create(&store, "a", "b", Amount::new(dec!(1)).unwrap(), id)
            .await
            .unwrap();

        assert!(matches!(
            store.approve("b", id).await,
            Err(WalletError::NotAuthorized { .. })
        ));

        let approved = store.approve("a", id).await.unwrap();
        assert_eq!(approved.status, TransactionStatus::Approved);

        assert!(matches!(
            store.decline("a", id).await,
            Err(WalletError::InvalidState { .. })
        ));

        // set_failed overrides terminal states; it is engine-internal.
        let failed = store.set_failed(id).await.unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);
    }
}
