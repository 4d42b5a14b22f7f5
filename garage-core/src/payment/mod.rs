//! Payment collaborator
//!
//! Paid garage operations call `process_payment` first and only commit
//! once it succeeds. The ledger behind the trait is external; `MockLedger`
//! is an in-memory stand-in for demos and tests.

mod ledger;

pub use ledger::{LedgerAccount, MockLedger};

use std::future::Future;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("Unknown ledger account: {0}")]
    UnknownAccount(String),

    #[error("Insufficient funds: required {required} XRP, available {available} XRP")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Payment rejected by ledger: {0}")]
    Rejected(String),
}

/// A ledger that can charge a payer and report balances
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` XRP to the account behind `payer_credential`.
    /// Returns the ledger's transaction reference.
    fn process_payment(
        &self,
        payer_credential: &str,
        amount: f64,
    ) -> impl Future<Output = Result<String, PaymentError>> + Send;

    fn get_balance(&self, address: &str) -> impl Future<Output = Result<f64, PaymentError>> + Send;
}
