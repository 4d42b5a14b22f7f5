//! Error taxonomy for garage operations
//!
//! Every error aborts the requested operation; no partial state is ever
//! committed to the registry.

use crate::payment::PaymentError;

pub type Result<T> = std::result::Result<T, GarageError>;

/// Garage-level errors
#[derive(Debug, thiserror::Error)]
pub enum GarageError {
    #[error("Car not found: {0}")]
    NotFound(String),

    #[error("Caller {caller} does not own car {car_id}")]
    NotOwner { car_id: String, caller: String },

    #[error("Payment failed: {0}")]
    PaymentFailed(#[from] PaymentError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Car id already registered: {0}")]
    DuplicateId(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for GarageError {
    fn from(e: std::io::Error) -> Self {
        GarageError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for GarageError {
    fn from(e: serde_json::Error) -> Self {
        GarageError::Storage(e.to_string())
    }
}
