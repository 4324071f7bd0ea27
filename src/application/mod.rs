//! Application layer containing the payment orchestration.
//!
//! This module defines the `PaymentEngine` which acts as the primary entry point
//! for executing payments. Concurrency safety comes from the ledger's
//! optimistic versioning: every short write step goes through
//! `retry::retry_on_conflict`.

pub mod config;
pub mod engine;
pub mod retry;
pub mod strategy;
