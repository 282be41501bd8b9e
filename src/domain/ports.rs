use super::account::{Account, AccountId, Amount, Balance, NewAccount};
use super::transaction::{Transaction, TransactionFilter, TransactionId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Keyed access to player accounts.
///
/// `set_balance` is the only way a balance changes; callers re-read through
/// the store instead of caching records across operations that might race.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Persists a candidate, assigning the next sequence id and a zero
    /// balance. Fails with `AccountExists` on a duplicate login or username.
    async fn create(&self, candidate: NewAccount) -> Result<Account>;

    async fn get_by_id(&self, id: AccountId) -> Result<Account>;

    async fn get_by_login(&self, login: &str) -> Result<Account>;

    async fn get_by_username(&self, username: &str) -> Result<Account>;

    /// Overwrites the stored balance and returns the refreshed record.
    async fn set_balance(&self, login: &str, balance: Balance) -> Result<Account>;

    /// All accounts, ordered by id.
    async fn list(&self) -> Result<Vec<Account>>;
}

/// Append-and-transition access to transfer records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a PENDING record. Fails with `TransactionExists` when the id
    /// is already present; the existing record is left untouched.
    async fn create(
        &self,
        sender: &str,
        recipient: &str,
        amount: Amount,
        id: TransactionId,
    ) -> Result<Transaction>;

    async fn get(&self, id: TransactionId) -> Result<Transaction>;

    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;

    /// PENDING -> APPROVED. Only the record's sender may approve.
    async fn approve(&self, acting: &str, id: TransactionId) -> Result<Transaction>;

    /// PENDING -> DECLINED. Only the record's sender may decline.
    async fn decline(&self, acting: &str, id: TransactionId) -> Result<Transaction>;

    /// Unconditional transition to FAILED. Engine-internal; everything else
    /// goes through the guarded transitions above.
    async fn set_failed(&self, id: TransactionId) -> Result<Transaction>;
}

pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type TransactionStoreRef = Arc<dyn TransactionStore>;
