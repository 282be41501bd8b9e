//! Concurrency properties of settlement, exercised through the library.

use peerpay::application::wallet::WalletService;
use peerpay::domain::ports::{AccountStore, AccountStoreRef, TransactionStoreRef};
use peerpay::error::WalletError;
use peerpay::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransactionStore};
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

async fn service_with_players(
    players: &[(&str, Decimal)],
) -> (Arc<WalletService>, AccountStoreRef) {
    let accounts: AccountStoreRef = Arc::new(InMemoryAccountStore::new());
    let transactions: TransactionStoreRef = Arc::new(InMemoryTransactionStore::new());
    let service = WalletService::new(accounts.clone(), transactions);
    for (login, balance) in players {
        service
            .register(login, &format!("{login}_display"), b"hash".to_vec())
            .await
            .unwrap();
        accounts
            .set_balance(login, peerpay::domain::account::Balance::new(*balance))
            .await
            .unwrap();
    }
    (Arc::new(service), accounts)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn hammering_one_sender_never_overdraws() {
    let (service, accounts) =
        service_with_players(&[("hub", dec!(10)), ("a", dec!(0)), ("b", dec!(0))]).await;

    // 30 unit transfers against a balance of 10: exactly 10 settle.
    let mut handles = Vec::new();
    for i in 0..30 {
        let service = service.clone();
        let recipient = if i % 2 == 0 { "a" } else { "b" };
        handles.push(tokio::spawn(async move {
            service
                .transfer("hub", recipient, dec!(1), Uuid::new_v4())
                .await
        }));
    }

    let mut settled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => settled += 1,
            Err(WalletError::DeficientBalance { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(settled, 10);
    let hub = accounts.get_by_login("hub").await.unwrap();
    let a = accounts.get_by_login("a").await.unwrap();
    let b = accounts.get_by_login("b").await.unwrap();
    assert!(hub.balance.value() >= Decimal::ZERO);
    assert_eq!(hub.balance.value(), Decimal::ZERO);
    assert_eq!(a.balance.value() + b.balance.value(), dec!(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn shuffled_transfers_conserve_the_total() {
    let players = ["p1", "p2", "p3", "p4"];
    let (service, accounts) = service_with_players(
        &players
            .iter()
            .map(|p| (*p, dec!(25)))
            .collect::<Vec<_>>(),
    )
    .await;

    // Random pairs in both directions, including rejected overdrafts.
    let mut pairs = Vec::new();
    for from in players {
        for to in players {
            if from != to {
                pairs.push((from, to));
                pairs.push((from, to));
            }
        }
    }
    pairs.shuffle(&mut rand::thread_rng());

    let mut handles = Vec::new();
    for (from, to) in pairs {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.transfer(from, to, dec!(7), Uuid::new_v4()).await
        }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) | Err(WalletError::DeficientBalance { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    let mut total = Decimal::ZERO;
    for player in players {
        let account = accounts.get_by_login(player).await.unwrap();
        assert!(
            account.balance.value() >= Decimal::ZERO,
            "{player} went negative: {}",
            account.balance
        );
        total += account.balance.value();
    }
    assert_eq!(total, dec!(100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approvals_settle_exactly_once() {
    let (service, accounts) =
        service_with_players(&[("donor", dec!(10)), ("asker", dec!(0))]).await;

    let id = Uuid::new_v4();
    service
        .request_money("asker", "donor", dec!(4), id)
        .await
        .unwrap();

    let first = {
        let service = service.clone();
        tokio::spawn(async move { service.approve("donor", id).await })
    };
    let second = {
        let service = service.clone();
        tokio::spawn(async move { service.approve("donor", id).await })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let settled = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(settled, 1);
    for outcome in &outcomes {
        if let Err(e) = outcome {
            assert!(matches!(e, WalletError::InvalidState { .. }));
        }
    }

    // Funds moved exactly once.
    let donor = accounts.get_by_login("donor").await.unwrap();
    let asker = accounts.get_by_login("asker").await.unwrap();
    assert_eq!(donor.balance.value(), dec!(6));
    assert_eq!(asker.balance.value(), dec!(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creations_with_one_id_collide() {
    let (service, _) = service_with_players(&[("a", dec!(10)), ("b", dec!(0))]).await;

    let id = Uuid::new_v4();
    let first = {
        let service = service.clone();
        tokio::spawn(async move { service.transfer("a", "b", dec!(1), id).await })
    };
    let second = {
        let service = service.clone();
        tokio::spawn(async move { service.transfer("a", "b", dec!(1), id).await })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let settled = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(settled, 1);
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Err(WalletError::TransactionExists(_) | WalletError::InvalidState { .. })
    )));
}
