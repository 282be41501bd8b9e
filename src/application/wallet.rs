//! The operation surface handed to the authenticated request layer.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::account::{Account, Amount, NewAccount};
use crate::domain::ports::{AccountStore, AccountStoreRef, TransactionStore, TransactionStoreRef};
use crate::domain::transaction::{Direction, Transaction, TransactionId, parse_ids};
use crate::error::{Result, WalletError};

use super::engine::{Settlement, TransferEngine};
use super::requests::RequestWorkflow;

/// Facade over the transfer engine and the request workflow.
///
/// Callers arrive already authenticated; the logins passed in are trusted
/// to be resolved identities. Each operation validates its inputs at this
/// boundary and logs its outcome.
#[derive(Clone)]
pub struct WalletService {
    accounts: AccountStoreRef,
    transactions: TransactionStoreRef,
    engine: TransferEngine,
    requests: RequestWorkflow,
}

impl WalletService {
    pub fn new(accounts: AccountStoreRef, transactions: TransactionStoreRef) -> Self {
        let engine = TransferEngine::new(accounts.clone(), transactions.clone());
        let requests =
            RequestWorkflow::new(accounts.clone(), transactions.clone(), engine.clone());
        Self {
            accounts,
            transactions,
            engine,
            requests,
        }
    }

    pub async fn register(
        &self,
        login: &str,
        username: &str,
        password: Vec<u8>,
    ) -> Result<Account> {
        require_field("login", login)?;
        require_field("username", username)?;
        if password.is_empty() {
            return Err(WalletError::Validation(
                "password hash must not be empty".to_owned(),
            ));
        }
        let account = self
            .accounts
            .create(NewAccount {
                login: login.to_owned(),
                username: username.to_owned(),
                password,
            })
            .await?;
        info!(login, id = account.id, "account registered");
        Ok(account)
    }

    /// Exact-byte comparison against the stored credential. Unknown logins
    /// answer `BadCredentials` too, so probing cannot tell the cases apart.
    pub async fn authenticate(&self, login: &str, password: &[u8]) -> Result<Account> {
        let account = match self.accounts.get_by_login(login).await {
            Ok(account) => account,
            Err(WalletError::AccountNotFound(_)) => {
                return Err(WalletError::BadCredentials(login.to_owned()));
            }
            Err(e) => return Err(e),
        };
        if account.password != password {
            warn!(login, "credential mismatch");
            return Err(WalletError::BadCredentials(login.to_owned()));
        }
        Ok(account)
    }

    pub async fn transfer(
        &self,
        sender: &str,
        recipient: &str,
        amount: Decimal,
        id: TransactionId,
    ) -> Result<Settlement> {
        let amount = Amount::new(amount)?;
        let result = self.engine.initiate_push(sender, recipient, amount, id).await;
        match &result {
            Ok(s) => {
                info!(sender, recipient, %amount, %id, balance = %s.balance, "transfer settled")
            }
            Err(e) => warn!(sender, recipient, %amount, %id, reason = %e, "transfer rejected"),
        }
        result
    }

    pub async fn request_money(
        &self,
        requester: &str,
        donor: &str,
        amount: Decimal,
        id: TransactionId,
    ) -> Result<Transaction> {
        let amount = Amount::new(amount)?;
        let result = self
            .requests
            .initiate_request(requester, donor, amount, id)
            .await;
        match &result {
            Ok(_) => info!(requester, donor, %amount, %id, "money requested"),
            Err(e) => warn!(requester, donor, %amount, %id, reason = %e, "request rejected"),
        }
        result
    }

    pub async fn list_pending(&self, login: &str) -> Result<Vec<Transaction>> {
        self.requests.list_pending(login).await
    }

    pub async fn approve(&self, acting: &str, id: TransactionId) -> Result<Settlement> {
        let result = self.requests.approve(acting, id).await;
        match &result {
            Ok(s) => info!(acting, %id, balance = %s.balance, "request approved"),
            Err(e) => warn!(acting, %id, reason = %e, "approval rejected"),
        }
        result
    }

    pub async fn decline(&self, acting: &str, id: TransactionId) -> Result<Transaction> {
        let result = self.requests.decline(acting, id).await;
        match &result {
            Ok(_) => info!(acting, %id, "request declined"),
            Err(e) => warn!(acting, %id, reason = %e, "decline rejected"),
        }
        result
    }

    pub async fn history(
        &self,
        login: &str,
        direction: Option<Direction>,
    ) -> Result<Vec<Transaction>> {
        self.requests.history(login, direction).await
    }

    /// Resolves caller-supplied id strings. Entries that do not parse as
    /// UUIDs or match no record are skipped rather than failing the call.
    pub async fn lookup<S: AsRef<str>>(&self, raw_ids: &[S]) -> Result<Vec<Transaction>> {
        let mut found = Vec::new();
        for id in parse_ids(raw_ids) {
            match self.transactions.get(id).await {
                Ok(tx) => found.push(tx),
                Err(WalletError::TransactionNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// All accounts, ordered by id. Reporting only.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.accounts.list().await
    }
}

fn require_field(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WalletError::Validation(format!("{name} must not be empty")));
    }
    Ok(())
}
