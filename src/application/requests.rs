//! Solicited transfers: ask another player for money, settle on approval.

use crate::domain::account::Amount;
use crate::domain::ports::{AccountStore, AccountStoreRef, TransactionStore, TransactionStoreRef};
use crate::domain::transaction::{
    Direction, Transaction, TransactionFilter, TransactionId, TransactionStatus,
};
use crate::error::Result;

use super::engine::{Settlement, TransferEngine, ensure_distinct};

/// Money-request flow on top of the transfer engine.
///
/// A request is a PENDING record whose sender is the donor (the account
/// that will be debited). Funds move only when the donor approves; until
/// then the record is just a standing claim.
#[derive(Clone)]
pub struct RequestWorkflow {
    accounts: AccountStoreRef,
    transactions: TransactionStoreRef,
    engine: TransferEngine,
}

impl RequestWorkflow {
    pub fn new(
        accounts: AccountStoreRef,
        transactions: TransactionStoreRef,
        engine: TransferEngine,
    ) -> Self {
        Self {
            accounts,
            transactions,
            engine,
        }
    }

    /// Records that `requester` asks `donor` for `amount`. Both parties must
    /// exist; no balances move.
    pub async fn initiate_request(
        &self,
        requester: &str,
        donor: &str,
        amount: Amount,
        id: TransactionId,
    ) -> Result<Transaction> {
        ensure_distinct(donor, requester)?;
        self.accounts.get_by_login(requester).await?;
        self.accounts.get_by_login(donor).await?;
        self.transactions.create(donor, requester, amount, id).await
    }

    /// Requests still owed by `login`, i.e. where it is the would-be payer.
    pub async fn list_pending(&self, login: &str) -> Result<Vec<Transaction>> {
        let filter = TransactionFilter {
            sender: Some(login.to_owned()),
            status: Some(TransactionStatus::Pending),
            ..Default::default()
        };
        self.transactions.query(&filter).await
    }

    /// Settles a pending request. The ownership and PENDING checks happen
    /// inside the engine's critical section; only the donor passes them.
    pub async fn approve(&self, acting: &str, id: TransactionId) -> Result<Settlement> {
        let tx = self.transactions.get(id).await?;
        self.engine.settle(acting, &tx).await
    }

    /// Declines a pending request; no balance movement.
    pub async fn decline(&self, acting: &str, id: TransactionId) -> Result<Transaction> {
        self.transactions.decline(acting, id).await
    }

    /// Transactions `login` sent, received, or both when no direction is
    /// given.
    pub async fn history(
        &self,
        login: &str,
        direction: Option<Direction>,
    ) -> Result<Vec<Transaction>> {
        let sent = TransactionFilter {
            sender: Some(login.to_owned()),
            ..Default::default()
        };
        let received = TransactionFilter {
            recipient: Some(login.to_owned()),
            ..Default::default()
        };
        match direction {
            Some(Direction::Debit) => self.transactions.query(&sent).await,
            Some(Direction::Credit) => self.transactions.query(&received).await,
            None => {
                // A record never has the same login on both sides, so the
                // two result sets are disjoint.
                let mut all = self.transactions.query(&sent).await?;
                all.extend(self.transactions.query(&received).await?);
                Ok(all)
            }
        }
    }
}
