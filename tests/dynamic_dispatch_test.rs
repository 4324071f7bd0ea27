use paysim::domain::account::NewAccount;
use paysim::domain::payment::{PaymentStatus, PaymentType};
use paysim::application::config::EngineConfig;
use paysim::application::engine::PaymentEngine;
use paysim::application::retry::RetryPolicy;
use paysim::domain::payment::PaymentRequest;
use paysim::domain::ports::{AccountStore, LedgerRef, ReceiveRequest, ReceiverClient, ReceiverRef};
use paysim::infrastructure::in_memory::InMemoryLedger;
use paysim::infrastructure::receiver::LedgerReceiver;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let ledger: LedgerRef = Arc::new(InMemoryLedger::new());
    let receiver: ReceiverRef = Arc::new(LedgerReceiver::new(ledger.clone(), Default::default()));

    ledger
        .create(NewAccount {
            tax_id: "98765432100".to_string(),
            name: "Bob".to_string(),
            balance: dec!(0),
        })
        .await
        .unwrap();

    // Verify Send + Sync by spawning tasks
    let receiver_handle = tokio::spawn(async move {
        receiver
            .receive(ReceiveRequest {
                counterparty: "98765432100".to_string(),
                amount: dec!(12.50),
                payer_tax_id: "12345678900".to_string(),
            })
            .await
            .unwrap()
    });
    let response = receiver_handle.await.unwrap();
    assert!(response.received);

    let ledger_handle = tokio::spawn(async move {
        ledger.find_by_tax_id("98765432100").await.unwrap().unwrap()
    });
    let account = ledger_handle.await.unwrap();
    assert_eq!(account.balance.0, dec!(12.50));
}

#[tokio::test]
async fn test_engine_is_shareable_across_tasks() {
    let inner = Arc::new(InMemoryLedger::new());
    inner
        .create(NewAccount {
            tax_id: "12345678900".to_string(),
            name: "Alice".to_string(),
            balance: dec!(100.00),
        })
        .await
        .unwrap();
    let ledger: LedgerRef = inner;
    let receiver = Arc::new(LedgerReceiver::new(ledger.clone(), Default::default()));
    let config = EngineConfig {
        retry: RetryPolicy {
            max_attempts: 10,
            ..RetryPolicy::default()
        },
        ..EngineConfig::default()
    };
    let engine = Arc::new(PaymentEngine::new(ledger, receiver).with_config(config));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .create_and_process(PaymentRequest {
                        r#type: PaymentType::Card,
                        account: 1,
                        amount: dec!(10.00),
                        counterparty: None,
                        idempotency_key: None,
                    })
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().status, PaymentStatus::Approved);
    }
    assert_eq!(engine.account(1).await.unwrap().balance, dec!(60.00));
}
