use super::config::EngineConfig;
use super::retry::retry_on_conflict;
use crate::domain::payment::{Payment, PaymentId, PaymentType};
use crate::domain::ports::{
    AccountStore, ChangeSet, Ledger, PaymentStore, ReceiveRequest, ReceiverClient,
};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

pub(crate) const MISSING_COUNTERPARTY: &str = "Transfer requires the counterparty key";

/// Verdict of a strategy. The engine decides what it means for the record.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub success: bool,
    pub message: String,
}

impl PaymentOutcome {
    pub fn approved(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Collaborators a strategy may use while executing a payment.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    pub ledger: &'a dyn Ledger,
    pub receiver: &'a dyn ReceiverClient,
    pub config: &'a EngineConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStrategy {
    Boleto,
    CreditCard,
    Transfer,
}

impl PaymentStrategy {
    pub fn supports(&self, r#type: PaymentType) -> bool {
        matches!(
            (self, r#type),
            (PaymentStrategy::Boleto, PaymentType::Boleto)
                | (PaymentStrategy::CreditCard, PaymentType::Card)
                | (PaymentStrategy::Transfer, PaymentType::Transfer)
        )
    }

    /// Executes the payment-specific work. Never touches the record status.
    pub async fn pay(&self, ctx: StrategyContext<'_>, payment: &Payment) -> Result<PaymentOutcome> {
        match self {
            PaymentStrategy::Boleto => {
                let refusal = debit_or_refuse(ctx, payment.id).await?;
                Ok(refusal.unwrap_or_else(|| {
                    PaymentOutcome::approved(format!("Boleto issued: {} (simulated)", boleto_line(payment)))
                }))
            }
            PaymentStrategy::CreditCard => {
                let refusal = debit_or_refuse(ctx, payment.id).await?;
                Ok(refusal.unwrap_or_else(|| PaymentOutcome::approved("Card approved (simulated)")))
            }
            PaymentStrategy::Transfer => transfer(ctx, payment).await,
        }
    }
}

/// Maps a payment type to the first registered strategy that supports it.
#[derive(Debug, Clone)]
pub struct StrategyResolver {
    strategies: Vec<PaymentStrategy>,
}

impl Default for StrategyResolver {
    fn default() -> Self {
        Self::new(vec![
            PaymentStrategy::Transfer,
            PaymentStrategy::Boleto,
            PaymentStrategy::CreditCard,
        ])
    }
}

impl StrategyResolver {
    pub fn new(strategies: Vec<PaymentStrategy>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, r#type: PaymentType) -> Result<PaymentStrategy> {
        self.strategies
            .iter()
            .copied()
            .find(|strategy| strategy.supports(r#type))
            .ok_or(PaymentError::UnsupportedPaymentType(r#type))
    }
}

/// Debits the payer and flags the record in one change set.
///
/// A no-op when the record already carries the debit.
async fn debit_payer(ctx: StrategyContext<'_>, id: PaymentId) -> Result<()> {
    retry_on_conflict(&ctx.config.retry, move || async move {
        let mut payment = ctx
            .ledger
            .get_payment(id)
            .await?
            .ok_or(PaymentError::RecordNotFound(id))?;
        if payment.debit_applied {
            return Ok(());
        }
        if !payment.is_pending() {
            return Err(PaymentError::InvalidTransition {
                id,
                status: payment.status,
            });
        }

        let mut payer = ctx
            .ledger
            .get(payment.account)
            .await?
            .ok_or(PaymentError::AccountNotFound(payment.account))?;
        payer.debit(payment.amount.value())?;
        payment.mark_debit_applied();

        ctx.ledger
            .commit(ChangeSet::new().account(payer).payment(payment))
            .await
    })
    .await
}

async fn debit_or_refuse(ctx: StrategyContext<'_>, id: PaymentId) -> Result<Option<PaymentOutcome>> {
    match debit_payer(ctx, id).await {
        Ok(()) => Ok(None),
        Err(PaymentError::InsufficientFunds { balance, requested }) => {
            Ok(Some(PaymentOutcome::refused(format!(
                "Insufficient funds: balance {balance}, requested {requested}"
            ))))
        }
        Err(e) => Err(e),
    }
}

async fn transfer(ctx: StrategyContext<'_>, payment: &Payment) -> Result<PaymentOutcome> {
    let Some(counterparty) = payment.counterparty() else {
        return Ok(PaymentOutcome::refused(MISSING_COUNTERPARTY));
    };

    if !payment.debit_applied {
        debit_payer(ctx, payment.id).await?;
    }

    let payer = ctx
        .ledger
        .get(payment.account)
        .await?
        .ok_or(PaymentError::AccountNotFound(payment.account))?;

    let request = ReceiveRequest {
        counterparty: counterparty.to_string(),
        amount: payment.amount.value(),
        payer_tax_id: payer.tax_id,
    };
    debug!(payment = %payment.id, counterparty, "calling receiver");

    let timeout = ctx.config.receiver_timeout;
    let response = match tokio::time::timeout(timeout, ctx.receiver.receive(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(PaymentError::ExternalCallFailed(reason))) => {
            return Err(PaymentError::ExternalCallFailed(reason));
        }
        Ok(Err(e)) => return Err(PaymentError::ExternalCallFailed(e.to_string())),
        Err(_) => {
            return Err(PaymentError::ExternalCallFailed(format!(
                "no answer within {timeout:?}"
            )));
        }
    };

    if response.received {
        Ok(PaymentOutcome::approved(format!("Transfer sent: {}", response.message)))
    } else {
        Ok(PaymentOutcome::refused(format!("Receiver refused: {}", response.message)))
    }
}

/// Largest amount, in cents, the ten-digit value field can carry.
const BOLETO_MAX_CENTS: Decimal = dec!(9999999999);

/// Deterministic simulated digitable line for a boleto.
///
/// Amounts that do not fit the value field are printed as zeros, which marks
/// a boleto with an open amount.
fn boleto_line(payment: &Payment) -> String {
    let digits = format!("{:039}", payment.id.as_u128());
    let cents = payment
        .amount
        .value()
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.trunc().normalize())
        .filter(|cents| *cents <= BOLETO_MAX_CENTS)
        .unwrap_or(Decimal::ZERO);
    format!(
        "34191.{} {}.{} {}.{} 5 1234{:0>10}",
        &digits[0..5],
        &digits[5..10],
        &digits[10..16],
        &digits[16..21],
        &digits[21..27],
        cents.to_string()
    )
}
