use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::Amount;

/// Caller-supplied transaction identity. Clients mint the id before the
/// first attempt so retries can be correlated instead of double-applied.
pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Declined,
    Failed,
}

impl TransactionStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Declined => "declined",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A single movement of funds from `sender` to `recipient`.
///
/// The parties and the amount are fixed at creation; only the status ever
/// changes, and only once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub status: TransactionStatus,
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
}

/// Which side of a transaction a history query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Transactions the account sent.
    Debit,
    /// Transactions the account received.
    Credit,
}

/// Conjunction of optional predicates for `TransactionStore::query`.
/// A default filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub status: Option<TransactionStatus>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.sender.as_deref().is_none_or(|s| s == tx.sender)
            && self.recipient.as_deref().is_none_or(|r| r == tx.recipient)
            && self.status.is_none_or(|status| status == tx.status)
    }
}

/// Filters caller-supplied id strings down to the ones that parse as UUIDs.
///
/// Invalid entries are dropped, not reported; callers that care can compare
/// input and output lengths.
pub fn parse_ids<S: AsRef<str>>(raw: &[S]) -> Vec<TransactionId> {
    raw.iter()
        .filter_map(|s| Uuid::parse_str(s.as_ref()).ok())
        .collect()
}
