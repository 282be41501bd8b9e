use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::account::{Account, AccountId, Amount, Balance, NewAccount};
use crate::domain::ports::{AccountStore, TransactionStore};
use crate::domain::transaction::{
    Transaction, TransactionFilter, TransactionId, TransactionStatus,
};
use crate::error::{Result, WalletError};

/// In-memory account set guarded by a `tokio::sync::RwLock`.
///
/// Accounts are keyed by login; id and username lookups scan, which is fine
/// at the scale this store serves (tests and the batch driver).
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    inner: Arc<RwLock<AccountMap>>,
}

#[derive(Default)]
struct AccountMap {
    by_login: HashMap<String, Account>,
    next_id: AccountId,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, candidate: NewAccount) -> Result<Account> {
        let mut inner = self.inner.write().await;
        if inner.by_login.contains_key(&candidate.login) {
            return Err(WalletError::AccountExists(candidate.login));
        }
        if inner
            .by_login
            .values()
            .any(|a| a.username == candidate.username)
        {
            return Err(WalletError::AccountExists(candidate.username));
        }
        inner.next_id += 1;
        let account = Account {
            id: inner.next_id,
            login: candidate.login,
            username: candidate.username,
            password: candidate.password,
            balance: Balance::ZERO,
        };
        inner
            .by_login
            .insert(account.login.clone(), account.clone());
        Ok(account)
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Account> {
        let inner = self.inner.read().await;
        inner
            .by_login
            .values()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| WalletError::AccountNotFound(format!("id {id}")))
    }

    async fn get_by_login(&self, login: &str) -> Result<Account> {
        let inner = self.inner.read().await;
        inner
            .by_login
            .get(login)
            .cloned()
            .ok_or_else(|| WalletError::AccountNotFound(login.to_owned()))
    }

    async fn get_by_username(&self, username: &str) -> Result<Account> {
        let inner = self.inner.read().await;
        inner
            .by_login
            .values()
            .find(|a| a.username == username)
            .cloned()
            .ok_or_else(|| WalletError::AccountNotFound(username.to_owned()))
    }

    async fn set_balance(&self, login: &str, balance: Balance) -> Result<Account> {
        let mut inner = self.inner.write().await;
        let account = inner
            .by_login
            .get_mut(login)
            .ok_or_else(|| WalletError::AccountNotFound(login.to_owned()))?;
        account.balance = balance;
        Ok(account.clone())
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<Account> = inner.by_login.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }
}

/// In-memory transaction ledger.
///
/// Status transitions take the write lock, so the check-and-set is atomic
/// and two racing approvals cannot both pass the PENDING check.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn transition(
        &self,
        acting: &str,
        id: TransactionId,
        target: TransactionStatus,
    ) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(&id)
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
        Ok(tx.clone())
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(
        &self,
        sender: &str,
        recipient: &str,
        amount: Amount,
        id: TransactionId,
    ) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&id) {
            return Err(WalletError::TransactionExists(id));
        }
        let tx = Transaction {
            id,
            status: TransactionStatus::Pending,
            sender: sender.to_owned(),
            recipient: recipient.to_owned(),
            amount,
        };
        transactions.insert(id, tx.clone());
        Ok(tx)
    }

    async fn get(&self, id: TransactionId) -> Result<Transaction> {
        let transactions = self.transactions.read().await;
        transactions
            .get(&id)
            .cloned()
            .ok_or(WalletError::TransactionNotFound(id))
    }

    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect())
    }

    async fn approve(&self, acting: &str, id: TransactionId) -> Result<Transaction> {
        self.transition(acting, id, TransactionStatus::Approved).await
    }

    async fn decline(&self, acting: &str, id: TransactionId) -> Result<Transaction> {
        self.transition(acting, id, TransactionStatus::Declined).await
    }

    async fn set_failed(&self, id: TransactionId) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(&id)
            .ok_or(WalletError::TransactionNotFound(id))?;
        tx.status = TransactionStatus::Failed;
        Ok(tx.clone())
    }
}
