use crate::error::{Result, WalletError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Register,
    Seed,
    Transfer,
    Request,
    Approve,
    Decline,
}

/// One row of the batch input.
///
/// Blank columns deserialize to `None`. Which fields a row needs depends on
/// the operation and is checked by the driver, not the reader:
/// `register` uses counterparty as the username and secret as the
/// credential; `transfer`/`request` use counterparty, amount and id;
/// `approve`/`decline` use id; `seed` uses amount.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub op: OperationKind,
    pub actor: String,
    pub counterparty: Option<String>,
    pub amount: Option<Decimal>,
    pub id: Option<Uuid>,
    pub secret: Option<String>,
}

/// Reads wallet operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record
/// lengths, and yields rows lazily so large batches stream.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<OperationRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WalletError::from))
    }
}
