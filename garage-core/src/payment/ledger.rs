//! MockLedger — in-memory XRP ledger stand-in
//!
//! Accounts are keyed by their secret credential (the wallet seed) and carry
//! a public address. Every payment moves funds to the treasury and yields a
//! SHA256 transaction reference.

use super::{PaymentError, PaymentGateway};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub address: String,
    pub balance: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    treasury_address: String,
    treasury_balance: f64,
    accounts: HashMap<String, LedgerAccount>,
    sequence: u64,
}

#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(treasury_address: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                treasury_address: treasury_address.into(),
                ..LedgerState::default()
            }),
        }
    }

    /// Faucet: create the account if needed and credit it.
    ///
    /// A credential keeps the address it was first funded under, and an
    /// address belongs to exactly one credential.
    pub async fn fund(&self, credential: &str, address: &str, amount: f64) -> Result<f64, PaymentError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PaymentError::InvalidAmount(amount));
        }
        let mut state = self.state.lock().await;
        if address == state.treasury_address {
            return Err(PaymentError::Rejected("cannot fund the treasury".to_string()));
        }
        if let Some(existing) = state.accounts.get(credential) {
            if existing.address != address {
                return Err(PaymentError::Rejected(format!(
                    "credential is registered to {}",
                    existing.address
                )));
            }
        } else if state.accounts.values().any(|a| a.address == address) {
            return Err(PaymentError::Rejected(format!(
                "{} is registered to another credential",
                address
            )));
        }
        let account = state
            .accounts
            .entry(credential.to_string())
            .or_insert_with(|| LedgerAccount {
                address: address.to_string(),
                balance: 0.0,
            });
        account.balance += amount;
        info!("Funded {} with {} XRP (balance {})", account.address, amount, account.balance);
        Ok(account.balance)
    }

    /// Address registered for a credential
    pub async fn address_of(&self, credential: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.accounts.get(credential).map(|a| a.address.clone())
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let state = self.state.lock().await;
        let json = serde_json::to_string_pretty(&*state)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a snapshot, or start a fresh ledger when the file does not exist
    pub fn open(
        path: impl AsRef<Path>,
        treasury_address: impl Into<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No ledger at {}, starting fresh", path.display());
            return Ok(Self::new(treasury_address));
        }
        Self::load(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        let state: LedgerState = serde_json::from_str(&json)?;
        Ok(Self { state: Mutex::new(state) })
    }

    fn tx_reference(credential: &str, amount: f64, sequence: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(credential.as_bytes());
        hasher.update(amount.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hex::encode_upper(hasher.finalize())
    }
}

impl PaymentGateway for MockLedger {
    async fn process_payment(&self, payer_credential: &str, amount: f64) -> Result<String, PaymentError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PaymentError::InvalidAmount(amount));
        }
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(payer_credential)
            .ok_or_else(|| PaymentError::UnknownAccount("<credential>".to_string()))?;
        if account.balance < amount {
            warn!(
                "Payment of {} XRP from {} declined (balance {})",
                amount, account.address, account.balance
            );
            return Err(PaymentError::InsufficientFunds {
                required: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        state.treasury_balance += amount;
        state.sequence += 1;
        let tx = Self::tx_reference(payer_credential, amount, state.sequence);
        info!("Payment of {} XRP settled: {}", amount, tx);
        Ok(tx)
    }

    async fn get_balance(&self, address: &str) -> Result<f64, PaymentError> {
        let state = self.state.lock().await;
        if address == state.treasury_address {
            return Ok(state.treasury_balance);
        }
        state
            .accounts
            .values()
            .find(|a| a.address == address)
            .map(|a| a.balance)
            .ok_or_else(|| PaymentError::UnknownAccount(address.to_string()))
    }
}
