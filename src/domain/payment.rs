use super::account::{AccountId, Amount};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PaymentId = Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Instant transfer to a counterparty (PIX).
    #[serde(alias = "pix")]
    Transfer,
    Boleto,
    #[serde(alias = "credit_card")]
    Card,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

/// Inbound request to create and execute a payment.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PaymentRequest {
    pub r#type: PaymentType,
    /// Payer account id.
    pub account: AccountId,
    pub amount: Decimal,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// A single attempted payment.
///
/// Status only moves out of `Pending`, and only once. `debit_applied` is set
/// in the same change set that debits the payer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub created_at: DateTime<Utc>,
    pub r#type: PaymentType,
    pub account: AccountId,
    pub amount: Amount,
    pub counterparty: Option<String>,
    pub status: PaymentStatus,
    pub debit_applied: bool,
    pub message: Option<String>,
    pub idempotency_key: Option<String>,
    pub version: u64,
}

impl Payment {
    pub fn new(
        r#type: PaymentType,
        account: AccountId,
        amount: Amount,
        counterparty: Option<String>,
        idempotency_key: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            r#type,
            account,
            amount,
            counterparty,
            status: PaymentStatus::Pending,
            debit_applied: false,
            message: None,
            idempotency_key,
            version: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// The counterparty reference, if present and not blank.
    pub fn counterparty(&self) -> Option<&str> {
        self.counterparty
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn mark_debit_applied(&mut self) {
        self.debit_applied = true;
    }

    pub fn approve(&mut self, message: impl Into<String>) -> Result<()> {
        self.finalize(PaymentStatus::Approved, message.into())
    }

    pub fn reject(&mut self, message: impl Into<String>) -> Result<()> {
        self.finalize(PaymentStatus::Rejected, message.into())
    }

    fn finalize(&mut self, status: PaymentStatus, message: String) -> Result<()> {
        if !self.is_pending() {
            return Err(PaymentError::InvalidTransition {
                id: self.id,
                status: self.status,
            });
        }
        self.status = status;
        self.message = Some(message);
        Ok(())
    }
}

/// Outbound projection of a payment record.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub r#type: PaymentType,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub message: Option<String>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id,
            r#type: payment.r#type,
            status: payment.status,
            amount: payment.amount.value(),
            message: payment.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending(r#type: PaymentType) -> Payment {
        Payment::new(
            r#type,
            1,
            Amount::new(dec!(10.00)).unwrap(),
            Some("98765432100".to_string()),
            Some("key-00000001".to_string()),
        )
    }

    #[test]
    fn test_new_payment_is_pending() {
        let payment = pending(PaymentType::Transfer);
        assert!(payment.is_pending());
        assert!(!payment.debit_applied);
        assert_eq!(payment.version, 0);
        assert!(payment.message.is_none());
    }

    #[test]
    fn test_status_is_single_use() {
        let mut payment = pending(PaymentType::Boleto);
        payment.approve("ok").unwrap();
        assert_eq!(payment.status, PaymentStatus::Approved);

        let result = payment.reject("too late");
        assert!(matches!(
            result,
            Err(PaymentError::InvalidTransition {
                status: PaymentStatus::Approved,
                ..
            })
        ));
        assert_eq!(payment.message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_blank_counterparty_is_absent() {
        let mut payment = pending(PaymentType::Transfer);
        payment.counterparty = Some("   ".to_string());
        assert_eq!(payment.counterparty(), None);
        payment.counterparty = None;
        assert_eq!(payment.counterparty(), None);
        payment.counterparty = Some(" 123 ".to_string());
        assert_eq!(payment.counterparty(), Some("123"));
    }

    #[test]
    fn test_request_deserialization_accepts_aliases() {
        let csv = "type,account,amount,counterparty,idempotency_key\npix,1,10.00,123,\ncredit_card,2,5,,";
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv.as_bytes());
        let requests: Vec<PaymentRequest> = reader
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .expect("Failed to deserialize requests");

        assert_eq!(requests[0].r#type, PaymentType::Transfer);
        assert_eq!(requests[0].counterparty.as_deref(), Some("123"));
        assert_eq!(requests[0].idempotency_key, None);
        assert_eq!(requests[1].r#type, PaymentType::Card);
        assert_eq!(requests[1].amount, dec!(5));
    }

    #[test]
    fn test_response_projection() {
        let mut payment = pending(PaymentType::Card);
        payment.approve("approved").unwrap();
        let response = PaymentResponse::from(&payment);
        assert_eq!(response.id, payment.id);
        assert_eq!(response.status, PaymentStatus::Approved);
        assert_eq!(response.amount, dec!(10.00));
    }
}
