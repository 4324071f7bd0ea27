use super::config::EngineConfig;
use super::retry::retry_on_conflict;
use super::strategy::{MISSING_COUNTERPARTY, PaymentStrategy, StrategyContext, StrategyResolver};
use crate::domain::account::{AccountId, AccountResponse, Amount};
use crate::domain::payment::{Payment, PaymentId, PaymentRequest, PaymentResponse, PaymentType};
use crate::domain::ports::{AccountStore, ChangeSet, Ledger, LedgerRef, PaymentStore, ReceiverRef};
use crate::error::{PaymentError, Result};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

const IDEMPOTENCY_KEY_LEN: std::ops::RangeInclusive<usize> = 8..=100;

/// Result of the create step.
enum Created {
    New(PaymentId),
    /// Another request already owns the idempotency key.
    Replayed(PaymentId),
}

/// The main entry point for executing payments.
///
/// `PaymentEngine` coordinates the ledger, the strategy set and the receiving
/// party. It holds no locks of its own: every state change is a short
/// version-checked commit against the ledger, retried on write conflicts.
pub struct PaymentEngine {
    ledger: LedgerRef,
    receiver: ReceiverRef,
    resolver: StrategyResolver,
    config: EngineConfig,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine` with every strategy registered and the
    /// default configuration.
    ///
    /// # Arguments
    ///
    /// * `ledger` - The store for accounts and payment records.
    /// * `receiver` - The receiving party for transfers.
    pub fn new(ledger: LedgerRef, receiver: ReceiverRef) -> Self {
        Self {
            ledger,
            receiver,
            resolver: StrategyResolver::default(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_resolver(mut self, resolver: StrategyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Creates a payment record and drives it to a final status.
    ///
    /// Transfers are debited together with the record creation, then the
    /// receiving party is called with no storage change in flight, then the
    /// outcome is committed. Card and boleto payments are debited by their
    /// strategy. Any failure after a debit is compensated by a refund.
    ///
    /// Replaying a request with a known idempotency key returns the existing
    /// record without debiting or calling the receiver again.
    #[instrument(skip_all, fields(payment_type = ?request.r#type, account = request.account))]
    pub async fn create_and_process(&self, request: PaymentRequest) -> Result<PaymentResponse> {
        let (strategy, key) = self.validate(&request)?;

        if let Some(key) = key.as_deref()
            && let Some(existing) = self.ledger.find_by_idempotency_key(key).await?
        {
            debug!(payment = %existing.id, "idempotent replay");
            return self.settled(existing).await;
        }

        let request = &request;
        let key = key.as_deref();
        let id = match retry_on_conflict(&self.config.retry, move || self.create_payment(request, key))
            .await?
        {
            Created::New(id) => id,
            Created::Replayed(id) => {
                debug!(payment = %id, "idempotency key claimed concurrently");
                return self.settled(self.load(id).await?).await;
            }
        };

        let payment = self.load(id).await?;
        if !payment.is_pending() {
            return Ok(PaymentResponse::from(&payment));
        }

        let ctx = StrategyContext {
            ledger: self.ledger.as_ref(),
            receiver: self.receiver.as_ref(),
            config: &self.config,
        };
        match strategy.pay(ctx, &payment).await {
            Ok(outcome) if outcome.success => {
                if payment.r#type != PaymentType::Transfer {
                    self.mark_debit_applied(id).await?;
                }
                self.finalize_approved(id, &outcome.message).await?;
            }
            Ok(outcome) => self.finalize_rejected_with_refund(id, &outcome.message).await?,
            Err(PaymentError::ExternalCallFailed(reason)) => {
                self.finalize_rejected_with_refund(id, &format!("Receiver call failed: {reason}"))
                    .await?
            }
            Err(e) => {
                if let Err(finalize_error) = self.finalize_rejected_with_refund(id, &e.to_string()).await {
                    error!(payment = %id, %finalize_error, "could not close payment after failure");
                }
                return Err(e);
            }
        }

        self.payment(id).await
    }

    /// Current projection of a payment record.
    pub async fn payment(&self, id: PaymentId) -> Result<PaymentResponse> {
        Ok(PaymentResponse::from(&self.load(id).await?))
    }

    pub async fn account(&self, id: AccountId) -> Result<AccountResponse> {
        let account = self
            .ledger
            .get(id)
            .await?
            .ok_or(PaymentError::AccountNotFound(id))?;
        Ok(AccountResponse::from(&account))
    }

    pub async fn accounts(&self) -> Result<Vec<AccountResponse>> {
        let accounts = self.ledger.all_accounts().await?;
        Ok(accounts.iter().map(AccountResponse::from).collect())
    }

    /// Rejects structurally invalid requests before anything is written.
    fn validate(&self, request: &PaymentRequest) -> Result<(PaymentStrategy, Option<String>)> {
        Amount::new(request.amount)?;

        let key = request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        match &key {
            None if request.r#type == PaymentType::Transfer => {
                return Err(PaymentError::MissingIdempotencyKey);
            }
            Some(key) if !IDEMPOTENCY_KEY_LEN.contains(&key.chars().count()) => {
                return Err(PaymentError::ValidationError(format!(
                    "Idempotency key must be {} to {} characters long",
                    IDEMPOTENCY_KEY_LEN.start(),
                    IDEMPOTENCY_KEY_LEN.end()
                )));
            }
            _ => {}
        }

        let strategy = self.resolver.resolve(request.r#type)?;
        Ok((strategy, key))
    }

    /// One attempt of the create step. Transfers are debited here.
    async fn create_payment(&self, request: &PaymentRequest, key: Option<&str>) -> Result<Created> {
        // Read the payer before re-checking the key: a concurrent request that
        // already committed its debit under this key is then visible through it.
        let payer = match request.r#type {
            PaymentType::Transfer => self.ledger.get(request.account).await?,
            _ => None,
        };

        if let Some(key) = key
            && let Some(existing) = self.ledger.find_by_idempotency_key(key).await?
        {
            return Ok(Created::Replayed(existing.id));
        }

        let mut payment = Payment::new(
            request.r#type,
            request.account,
            Amount::new(request.amount)?,
            request.counterparty.clone(),
            key.map(str::to_string),
        );
        let id = payment.id;

        if payment.r#type != PaymentType::Transfer {
            self.ledger.commit(ChangeSet::new().payment(payment)).await?;
            return Ok(Created::New(id));
        }

        if payment.counterparty().is_none() {
            payment.reject(MISSING_COUNTERPARTY)?;
            self.ledger.commit(ChangeSet::new().payment(payment)).await?;
            warn!(payment = %id, "transfer rejected without counterparty");
            return Ok(Created::New(id));
        }

        let mut payer = payer.ok_or(PaymentError::AccountNotFound(request.account))?;
        payer.debit(request.amount)?;
        payment.mark_debit_applied();

        self.ledger
            .commit(ChangeSet::new().account(payer).payment(payment))
            .await?;
        debug!(payment = %id, "transfer debited");
        Ok(Created::New(id))
    }

    async fn mark_debit_applied(&self, id: PaymentId) -> Result<()> {
        retry_on_conflict(&self.config.retry, move || async move {
            let mut payment = self.load(id).await?;
            if !payment.is_pending() || payment.debit_applied {
                return Ok(());
            }
            payment.mark_debit_applied();
            self.ledger.commit(ChangeSet::new().payment(payment)).await
        })
        .await
    }

    async fn finalize_approved(&self, id: PaymentId, message: &str) -> Result<()> {
        retry_on_conflict(&self.config.retry, move || async move {
            let mut payment = self.load(id).await?;
            if !payment.is_pending() {
                debug!(payment = %id, status = ?payment.status, "already final");
                return Ok(());
            }
            payment.approve(message)?;
            self.ledger.commit(ChangeSet::new().payment(payment)).await
        })
        .await?;
        info!(payment = %id, message, "payment approved");
        Ok(())
    }

    /// Rejects the record, crediting the payer back when its debit was applied.
    async fn finalize_rejected_with_refund(&self, id: PaymentId, reason: &str) -> Result<()> {
        let refunded = retry_on_conflict(&self.config.retry, move || async move {
            let mut payment = self.load(id).await?;
            if !payment.is_pending() {
                debug!(payment = %id, status = ?payment.status, "already final");
                return Ok(false);
            }

            let mut changes = ChangeSet::new();
            let refund = payment.debit_applied;
            if refund {
                let mut payer = self
                    .ledger
                    .get(payment.account)
                    .await?
                    .ok_or(PaymentError::AccountNotFound(payment.account))?;
                payer.credit(payment.amount.value())?;
                changes = changes.account(payer);
            }
            payment.reject(format!("Rejected: {reason}"))?;
            self.ledger.commit(changes.payment(payment)).await?;
            Ok(refund)
        })
        .await?;
        warn!(payment = %id, refunded, reason, "payment rejected");
        Ok(())
    }

    /// Waits for a record owned by another request to leave `Pending`, up to
    /// `replay_wait`, and returns whatever state it is in by then.
    async fn settled(&self, mut payment: Payment) -> Result<PaymentResponse> {
        let deadline = Instant::now() + self.config.replay_wait;
        while payment.is_pending() && Instant::now() < deadline {
            tokio::time::sleep(self.config.replay_poll).await;
            payment = self.load(payment.id).await?;
        }
        Ok(PaymentResponse::from(&payment))
    }

    async fn load(&self, id: PaymentId) -> Result<Payment> {
        self.ledger
            .get_payment(id)
            .await?
            .ok_or(PaymentError::RecordNotFound(id))
    }
}
