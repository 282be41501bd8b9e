use crate::error::WalletError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Sequence id assigned by the account store on registration.
pub type AccountId = u64;

/// A monetary balance.
///
/// Wrapper around `rust_decimal::Decimal` so money never passes through
/// floating point. The ledger guarantees it stays non-negative; the type
/// itself only provides the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive transfer amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, WalletError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(WalletError::Validation(format!(
                "amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WalletError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Add<Amount> for Balance {
    type Output = Self;
    fn add(self, rhs: Amount) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Amount> for Balance {
    type Output = Self;
    fn sub(self, rhs: Amount) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered player.
///
/// `login` and `username` are unique across the account set and immutable
/// after registration. The credential is an opaque hash computed upstream;
/// the ledger only ever compares it byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub login: String,
    pub username: String,
    pub password: Vec<u8>,
    pub balance: Balance,
}

/// Registration candidate; the store assigns the id and zeroes the balance.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub login: String,
    pub username: String,
    pub password: Vec<u8>,
}
