//! End-to-end request workflow scenarios through the wallet facade.

use peerpay::application::wallet::WalletService;
use peerpay::domain::account::Balance;
use peerpay::domain::ports::{AccountStore, AccountStoreRef, TransactionStoreRef};
use peerpay::domain::transaction::{Direction, TransactionStatus};
use peerpay::error::WalletError;
use peerpay::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransactionStore};
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

async fn funded_service() -> (WalletService, AccountStoreRef) {
    let accounts: AccountStoreRef = Arc::new(InMemoryAccountStore::new());
    let transactions: TransactionStoreRef = Arc::new(InMemoryTransactionStore::new());
    let service = WalletService::new(accounts.clone(), transactions);
    service
        .register("admin", "Admin", b"hash-admin".to_vec())
        .await
        .unwrap();
    service
        .register("user", "User", b"hash-user".to_vec())
        .await
        .unwrap();
    accounts
        .set_balance("admin", Balance::new(dec!(10)))
        .await
        .unwrap();
    (service, accounts)
}

#[tokio::test]
async fn request_then_decline_then_decline_again() {
    let (service, accounts) = funded_service().await;
    let id = Uuid::new_v4();

    let tx = service
        .request_money("user", "admin", dec!(5), id)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.sender, "admin");
    assert_eq!(tx.recipient, "user");

    let pending = service.list_pending("admin").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);

    let declined = service.decline("admin", id).await.unwrap();
    assert_eq!(declined.status, TransactionStatus::Declined);
    assert_eq!(
        accounts.get_by_login("admin").await.unwrap().balance,
        Balance::new(dec!(10))
    );
    assert_eq!(
        accounts.get_by_login("user").await.unwrap().balance,
        Balance::ZERO
    );

    let again = service.decline("admin", id).await;
    assert!(matches!(again, Err(WalletError::InvalidState { .. })));
}

#[tokio::test]
async fn approved_request_settles_and_leaves_the_pending_list() {
    let (service, accounts) = funded_service().await;
    let id = Uuid::new_v4();
    service
        .request_money("user", "admin", dec!(5), id)
        .await
        .unwrap();

    let settlement = service.approve("admin", id).await.unwrap();
    assert_eq!(settlement.balance, Balance::new(dec!(5)));
    assert_eq!(settlement.transaction.status, TransactionStatus::Approved);

    assert!(service.list_pending("admin").await.unwrap().is_empty());
    assert_eq!(
        accounts.get_by_login("user").await.unwrap().balance,
        Balance::new(dec!(5))
    );
}

#[tokio::test]
async fn history_reports_both_directions() {
    let (service, _) = funded_service().await;
    let push_id = Uuid::new_v4();
    let request_id = Uuid::new_v4();

    service
        .transfer("admin", "user", dec!(3), push_id)
        .await
        .unwrap();
    service
        .request_money("admin", "user", dec!(2), request_id)
        .await
        .unwrap();

    // admin sent the push and is the requester (recipient) of the request.
    let debits = service
        .history("admin", Some(Direction::Debit))
        .await
        .unwrap();
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].id, push_id);

    let credits = service
        .history("admin", Some(Direction::Credit))
        .await
        .unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].id, request_id);

    let everything = service.history("admin", None).await.unwrap();
    assert_eq!(everything.len(), 2);

    let user_debits = service
        .history("user", Some(Direction::Debit))
        .await
        .unwrap();
    assert_eq!(user_debits.len(), 1);
    assert_eq!(user_debits[0].id, request_id);
}

#[tokio::test]
async fn failed_settlement_keeps_the_record_failed() {
    let (service, accounts) = funded_service().await;
    accounts
        .set_balance("admin", Balance::new(dec!(2)))
        .await
        .unwrap();
    let id = Uuid::new_v4();
    service
        .request_money("user", "admin", dec!(5), id)
        .await
        .unwrap();

    let result = service.approve("admin", id).await;
    assert!(matches!(result, Err(WalletError::DeficientBalance { .. })));

    // The id is spent: the record is terminal, a retry cannot revive it.
    let found = service.lookup(&[id.to_string()]).await.unwrap();
    assert_eq!(found[0].status, TransactionStatus::Failed);
    let retry = service.approve("admin", id).await;
    assert!(matches!(retry, Err(WalletError::InvalidState { .. })));
}
