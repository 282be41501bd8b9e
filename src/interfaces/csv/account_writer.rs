use crate::domain::account::{Account, AccountId};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    id: AccountId,
    login: &'a str,
    username: &'a str,
    balance: Decimal,
}

/// Writes the final account report as CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
        }
    }

    /// One row per account. The credential is deliberately not part of the
    /// report.
    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        for account in accounts {
            self.writer.serialize(AccountRow {
                id: account.id,
                login: &account.login,
                username: &account.username,
                balance: account.balance.value(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
