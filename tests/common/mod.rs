#![allow(dead_code)]

use async_trait::async_trait;
use paysim::application::config::EngineConfig;
use paysim::application::engine::PaymentEngine;
use paysim::application::retry::{Backoff, RetryPolicy};
use paysim::domain::account::{Account, AccountId, NewAccount};
use paysim::domain::payment::{Payment, PaymentId, PaymentRequest, PaymentType};
use paysim::domain::ports::{
    AccountStore, ChangeSet, Ledger, PaymentStore, ReceiveRequest, ReceiveResponse,
    ReceiverClient,
};
use paysim::error::{PaymentError, Result};
use paysim::infrastructure::in_memory::InMemoryLedger;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

pub const PAYER: &str = "12345678900";
pub const PAYEE: &str = "98765432100";

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::Linear(Duration::from_millis(1)),
        },
        receiver_timeout: Duration::from_millis(200),
        replay_wait: Duration::from_secs(2),
        replay_poll: Duration::from_millis(5),
    }
}

pub async fn seeded_ledger(accounts: &[(&str, Decimal)]) -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    for (tax_id, balance) in accounts {
        ledger
            .create(NewAccount {
                tax_id: tax_id.to_string(),
                name: format!("Holder {}", tax_id),
                balance: *balance,
            })
            .await
            .unwrap();
    }
    ledger
}

pub async fn balance(ledger: &InMemoryLedger, id: AccountId) -> Decimal {
    ledger.get(id).await.unwrap().unwrap().balance.0
}

pub fn transfer(account: AccountId, amount: Decimal, counterparty: &str, key: &str) -> PaymentRequest {
    PaymentRequest {
        r#type: PaymentType::Transfer,
        account,
        amount,
        counterparty: Some(counterparty.to_string()),
        idempotency_key: Some(key.to_string()),
    }
}

pub fn boleto(account: AccountId, amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        r#type: PaymentType::Boleto,
        account,
        amount,
        counterparty: None,
        idempotency_key: None,
    }
}

pub fn card(account: AccountId, amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        r#type: PaymentType::Card,
        ..boleto(account, amount)
    }
}

#[derive(Debug, Clone)]
pub enum Script {
    Accept,
    Refuse(&'static str),
    Fail(&'static str),
    Hang,
}

/// Receiving party with a fixed answer that counts its calls.
pub struct ScriptedReceiver {
    script: Script,
    pub calls: AtomicUsize,
}

impl ScriptedReceiver {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceiverClient for ScriptedReceiver {
    async fn receive(&self, request: ReceiveRequest) -> Result<ReceiveResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Accept => Ok(ReceiveResponse {
                received: true,
                message: format!("Credit applied to {}", request.counterparty),
            }),
            Script::Refuse(message) => Ok(ReceiveResponse {
                received: false,
                message: message.to_string(),
            }),
            Script::Fail(message) => Err(PaymentError::ExternalCallFailed(message.to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                unreachable!("the engine times the receiver out")
            }
        }
    }
}

pub fn engine(ledger: Arc<InMemoryLedger>, receiver: Arc<ScriptedReceiver>) -> PaymentEngine {
    PaymentEngine::new(ledger, receiver).with_config(fast_config())
}

/// Ledger whose next `conflicts` commits fail with a write conflict.
pub struct ConflictingLedger {
    inner: Arc<InMemoryLedger>,
    conflicts: AtomicU32,
    pub commits: AtomicU32,
}

impl ConflictingLedger {
    pub fn new(inner: Arc<InMemoryLedger>, conflicts: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            conflicts: AtomicU32::new(conflicts),
            commits: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl AccountStore for ConflictingLedger {
    async fn create(&self, account: NewAccount) -> Result<Account> {
        self.inner.create(account).await
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.get(id).await
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Account>> {
        self.inner.find_by_tax_id(tax_id).await
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        self.inner.all_accounts().await
    }
}

#[async_trait]
impl PaymentStore for ConflictingLedger {
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.inner.get_payment(id).await
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>> {
        self.inner.find_by_idempotency_key(key).await
    }
}

#[async_trait]
impl Ledger for ConflictingLedger {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PaymentError::WriteConflict);
        }
        self.inner.commit(changes).await
    }
}
