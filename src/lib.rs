//! Peer-to-peer wallet ledger.
//!
//! Players hold a decimal balance and either push money to another player
//! or solicit it; every movement is a uuid-keyed transaction driven through
//! a PENDING -> APPROVED/DECLINED/FAILED lifecycle. The `domain` module
//! holds the types and store ports, `application` the settlement engine and
//! workflows, `infrastructure` the store backends, and `interfaces` the CSV
//! surface of the batch driver.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
