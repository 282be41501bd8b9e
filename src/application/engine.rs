//! Balance-checked settlement of transfer records.
//!
//! Settlement is the one place balances change: check the sender can cover
//! the amount, debit the sender, credit the recipient, approve the record.
//! The whole sequence runs inside a per-account-pair critical section so
//! concurrent transfers on the same sender cannot interleave a stale
//! balance read past the check.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::account::{Amount, Balance};
use crate::domain::ports::{AccountStore, AccountStoreRef, TransactionStore, TransactionStoreRef};
use crate::domain::transaction::{Transaction, TransactionId, TransactionStatus};
use crate::error::{Result, WalletError};

/// Outcome of a settled transfer: the sender's refreshed balance and the
/// approved record.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub balance: Balance,
    pub transaction: Transaction,
}

/// One async mutex per login, handed out on demand.
///
/// Settlement locks both parties in sorted login order, which rules out
/// lock-order inversion between transfers running in opposite directions.
#[derive(Default, Clone)]
struct AccountLocks {
    handles: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
    async fn handle(&self, login: &str) -> Arc<Mutex<()>> {
        let mut handles = self.handles.lock().await;
        handles.entry(login.to_owned()).or_default().clone()
    }

    async fn lock_pair(
        &self,
        a: &str,
        b: &str,
    ) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let first_guard = self.handle(first).await.lock_owned().await;
        if first == second {
            return (first_guard, None);
        }
        let second_guard = self.handle(second).await.lock_owned().await;
        (first_guard, Some(second_guard))
    }
}

/// Moves funds between two accounts and drives the record to a terminal
/// status.
#[derive(Clone)]
pub struct TransferEngine {
    accounts: AccountStoreRef,
    transactions: TransactionStoreRef,
    locks: AccountLocks,
}

impl TransferEngine {
    pub fn new(accounts: AccountStoreRef, transactions: TransactionStoreRef) -> Self {
        Self {
            accounts,
            transactions,
            locks: AccountLocks::default(),
        }
    }

    /// Sender-initiated transfer: creates a PENDING record and settles it
    /// immediately.
    ///
    /// Both parties are resolved up front, so an unknown party fails
    /// `NotFound` without leaving a record behind.
    pub async fn initiate_push(
        &self,
        sender: &str,
        recipient: &str,
        amount: Amount,
        id: TransactionId,
    ) -> Result<Settlement> {
        ensure_distinct(sender, recipient)?;
        self.accounts.get_by_login(sender).await?;
        self.accounts.get_by_login(recipient).await?;
        let tx = self
            .transactions
            .create(sender, recipient, amount, id)
            .await?;
        self.settle(sender, &tx).await
    }

    /// Settles a PENDING record: debits the sender, credits the recipient
    /// and approves the record, or marks it FAILED when the sender cannot
    /// cover the amount.
    ///
    /// `acting` must be the record's sender. The record is re-read under the
    /// account-pair lock, so of two racing settlements of the same record
    /// exactly one passes the PENDING gate; the other fails `InvalidState`
    /// without touching a balance.
    pub async fn settle(&self, acting: &str, tx: &Transaction) -> Result<Settlement> {
        let _guards = self.locks.lock_pair(&tx.sender, &tx.recipient).await;

        // The caller's copy may be stale; the parties are immutable but the
        // status is not.
        let current = self.transactions.get(tx.id).await?;
        if current.status != TransactionStatus::Pending {
            return Err(WalletError::InvalidState {
                id: current.id,
                status: current.status,
            });
        }
        if acting != current.sender {
            return Err(WalletError::NotAuthorized {
                actor: acting.to_owned(),
                id: current.id,
            });
        }

        let sender = self.accounts.get_by_login(&current.sender).await?;
        let recipient = self.accounts.get_by_login(&current.recipient).await?;

        if sender.balance < Balance::from(current.amount) {
            self.transactions.set_failed(current.id).await?;
            return Err(WalletError::DeficientBalance {
                login: sender.login,
                available: sender.balance.value(),
                requested: current.amount.value(),
            });
        }

        let sender = self
            .accounts
            .set_balance(&sender.login, sender.balance - current.amount)
            .await?;
        self.accounts
            .set_balance(&recipient.login, recipient.balance + current.amount)
            .await?;
        let approved = self
            .transactions
            .approve(&current.sender, current.id)
            .await?;

        Ok(Settlement {
            balance: sender.balance,
            transaction: approved,
        })
    }
}

pub(crate) fn ensure_distinct(sender: &str, recipient: &str) -> Result<()> {
    if sender == recipient {
        return Err(WalletError::Validation(format!(
            "sender and recipient must differ, both are {sender}"
        )));
    }
    Ok(())
}
