use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Storage-assigned account identifier.
pub type AccountId = u64;

/// Represents a monetary balance held by an account.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific rules
/// and provide type safety for financial calculations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount for payments.
///
/// Ensures that payment amounts are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

/// Seed data for an account that does not have a storage id yet.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct NewAccount {
    pub tax_id: String,
    pub name: String,
    pub balance: Decimal,
}

/// A balance holder in the internal ledger.
///
/// `version` is bumped by the store on every committed write; a change set
/// carrying a stale version is refused with `PaymentError::WriteConflict`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    /// Natural key (national tax id), unique across accounts.
    pub tax_id: String,
    pub name: String,
    pub balance: Balance,
    pub version: u64,
}

impl Account {
    pub fn new(id: AccountId, tax_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            tax_id: tax_id.into(),
            name: name.into(),
            balance: Balance::ZERO,
            version: 0,
        }
    }

    /// Removes funds from the balance, refusing to go below zero.
    pub fn debit(&mut self, amount: Decimal) -> Result<()> {
        let amount = Balance::from(Amount::new(amount)?);
        if self.balance < amount {
            return Err(PaymentError::InsufficientFunds {
                balance: self.balance.0,
                requested: amount.0,
            });
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(PaymentError::BalanceOverflow {
                balance: self.balance.0,
                amount: amount.0,
            })?;
        Ok(())
    }

    /// Adds funds to the balance. Fails, leaving it untouched, when the sum
    /// does not fit in a `Decimal`.
    pub fn credit(&mut self, amount: Decimal) -> Result<()> {
        let amount = Balance::from(Amount::new(amount)?);
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(PaymentError::BalanceOverflow {
                balance: self.balance.0,
                amount: amount.0,
            })?;
        Ok(())
    }
}

/// Read-only projection of an account.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct AccountResponse {
    pub id: AccountId,
    pub tax_id: String,
    pub name: String,
    pub balance: Decimal,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            tax_id: account.tax_id.clone(),
            name: account.name.clone(),
            balance: account.balance.0,
        }
    }
}
