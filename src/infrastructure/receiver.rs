use crate::application::retry::{RetryPolicy, retry_on_conflict};
use crate::domain::ports::{
    AccountStore, ChangeSet, Ledger, LedgerRef, ReceiveRequest, ReceiveResponse, ReceiverClient,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

/// Simulated receiving party that credits a counterparty account in a ledger.
///
/// The counterparty key is the receiving account's tax id.
pub struct LedgerReceiver {
    ledger: LedgerRef,
    retry: RetryPolicy,
}

impl LedgerReceiver {
    pub fn new(ledger: LedgerRef, retry: RetryPolicy) -> Self {
        Self { ledger, retry }
    }

    fn refuse(message: &str) -> ReceiveResponse {
        ReceiveResponse {
            received: false,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ReceiverClient for LedgerReceiver {
    async fn receive(&self, request: ReceiveRequest) -> Result<ReceiveResponse> {
        if request.amount <= Decimal::ZERO {
            return Ok(Self::refuse("Invalid amount"));
        }
        let key = request.counterparty.trim();
        if key.is_empty() {
            return Ok(Self::refuse("Invalid receiver key"));
        }

        let ledger = self.ledger.as_ref();
        let amount = request.amount;
        let credited = retry_on_conflict(&self.retry, move || async move {
            let Some(mut receiver) = ledger.find_by_tax_id(key).await? else {
                return Ok(false);
            };
            receiver.credit(amount)?;
            ledger.commit(ChangeSet::new().account(receiver)).await?;
            Ok::<_, PaymentError>(true)
        })
        .await?;

        if !credited {
            return Ok(Self::refuse("Receiver not found"));
        }
        info!(receiver = key, amount = %amount, from = %request.payer_tax_id, "credit applied");
        Ok(ReceiveResponse {
            received: true,
            message: format!("Credit applied to {key}"),
        })
    }
}
