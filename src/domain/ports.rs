use super::account::{Account, AccountId, NewAccount};
use super::payment::{Payment, PaymentId};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts seed data, assigning a fresh id. Fails on a duplicate tax id.
    async fn create(&self, account: NewAccount) -> Result<Account>;
    async fn get(&self, id: AccountId) -> Result<Option<Account>>;
    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Account>>;
    async fn all_accounts(&self) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>>;
}

/// Accounts and payments that change together.
///
/// Each entity carries the version it was read at. A new payment has version 0.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    pub accounts: Vec<Account>,
    pub payments: Vec<Payment>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }
}

/// Storage that can apply a `ChangeSet` atomically.
///
/// `commit` must fail with `PaymentError::WriteConflict`, writing nothing, when
/// any entity's version differs from the stored one or when a payment's
/// idempotency key already belongs to another record.
#[async_trait]
pub trait Ledger: AccountStore + PaymentStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

pub type LedgerRef = Arc<dyn Ledger>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReceiveRequest {
    pub counterparty: String,
    pub amount: Decimal,
    pub payer_tax_id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReceiveResponse {
    pub received: bool,
    pub message: String,
}

/// The receiving party of a transfer.
///
/// An `Err` means the call itself failed (transport, timeout); a refusal is an
/// `Ok` with `received == false`.
#[async_trait]
pub trait ReceiverClient: Send + Sync {
    async fn receive(&self, request: ReceiveRequest) -> Result<ReceiveResponse>;
}

pub type ReceiverRef = Arc<dyn ReceiverClient>;
