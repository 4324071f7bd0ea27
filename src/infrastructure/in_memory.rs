use crate::domain::account::{Account, AccountId, Balance, NewAccount};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{AccountStore, ChangeSet, Ledger, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    tax_ids: HashMap<String, AccountId>,
    payments: HashMap<PaymentId, Payment>,
    idempotency_keys: HashMap<String, PaymentId>,
    next_account_id: AccountId,
}

impl LedgerState {
    /// Checks every entity of `changes` against the stored state without writing.
    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        for account in &changes.accounts {
            let stored = self
                .accounts
                .get(&account.id)
                .ok_or(PaymentError::AccountNotFound(account.id))?;
            if stored.version != account.version {
                return Err(PaymentError::WriteConflict);
            }
        }

        for payment in &changes.payments {
            match self.payments.get(&payment.id) {
                Some(stored) if stored.version != payment.version => {
                    return Err(PaymentError::WriteConflict);
                }
                Some(_) => {}
                None if payment.version != 0 => {
                    return Err(PaymentError::RecordNotFound(payment.id));
                }
                None => {}
            }
            if let Some(key) = &payment.idempotency_key
                && let Some(owner) = self.idempotency_keys.get(key)
                && *owner != payment.id
            {
                return Err(PaymentError::WriteConflict);
            }
        }
        Ok(())
    }
}

/// A thread-safe in-memory ledger.
///
/// Accounts, payments and both indexes live behind a single
/// `Arc<RwLock<..>>`, so a commit is validated and applied under one write
/// guard. Ideal for testing or single-process simulations.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryLedger {
    async fn create(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.write().await;
        if state.tax_ids.contains_key(&account.tax_id) {
            return Err(PaymentError::DuplicateAccount(account.tax_id));
        }
        if account.balance < rust_decimal::Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Opening balance must not be negative".to_string(),
            ));
        }

        state.next_account_id += 1;
        let mut created = Account::new(state.next_account_id, account.tax_id, account.name);
        created.balance = Balance::new(account.balance);
        state.tax_ids.insert(created.tax_id.clone(), created.id);
        state.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .tax_ids
            .get(tax_id)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }
}

#[async_trait]
impl PaymentStore for InMemoryLedger {
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state.payments.get(&id).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .idempotency_keys
            .get(key)
            .and_then(|id| state.payments.get(id))
            .cloned())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut state = self.state.write().await;
        state.validate(&changes)?;

        for mut account in changes.accounts {
            account.version += 1;
            state.accounts.insert(account.id, account);
        }
        for mut payment in changes.payments {
            payment.version += 1;
            if let Some(key) = &payment.idempotency_key {
                state.idempotency_keys.insert(key.clone(), payment.id);
            }
            state.payments.insert(payment.id, payment);
        }
        Ok(())
    }
}
