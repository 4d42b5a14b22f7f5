//! Car — the racing unit owned by a ledger address
//!
//! A car is a value: training never edits one in place, it derives a new car
//! that shares the lineage's weights. Only `cached_speed` may be refreshed.

use super::{Attributes, Weights};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Type tag prefixed to every car id
pub const CAR_ID_PREFIX: &str = "CAR-";
/// Hex characters kept from the id hash (96 bits)
pub const CAR_ID_HEX_LEN: usize = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub owner: String,
    pub attributes: Attributes,
    pub weights: Weights,
    pub generation_count: u64,
    /// Car this one was trained from, if any
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_trained_at: Option<DateTime<Utc>>,
    pub cached_speed: Option<f64>,
}

/// What callers outside the core may see of a car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarView {
    pub id: String,
    pub owner: String,
    pub generation_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_trained_at: Option<DateTime<Utc>>,
}

impl Car {
    /// Create a fresh car: random attributes, freshly perturbed weights
    pub fn new<R: Rng + ?Sized>(owner: impl Into<String>, rng: &mut R) -> Self {
        let owner = owner.into();
        Self {
            id: generate_car_id(&owner, rng),
            attributes: Attributes::random(rng),
            weights: Weights::generate(rng),
            owner,
            generation_count: 0,
            parent_id: None,
            created_at: Utc::now(),
            last_trained_at: None,
            cached_speed: None,
        }
    }

    /// Assemble a car from known parts, e.g. fixtures or imported state
    pub fn with_parts(
        id: impl Into<String>,
        owner: impl Into<String>,
        attributes: Attributes,
        weights: Weights,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            attributes,
            weights,
            generation_count: 0,
            parent_id: None,
            created_at: Utc::now(),
            last_trained_at: None,
            cached_speed: None,
        }
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner == owner
    }

    pub fn view(&self) -> CarView {
        CarView {
            id: self.id.clone(),
            owner: self.owner.clone(),
            generation_count: self.generation_count,
            created_at: self.created_at,
            last_trained_at: self.last_trained_at,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Car '{}' | owner={} | generation={} | parent={}",
            self.id,
            self.owner,
            self.generation_count,
            self.parent_id.as_deref().unwrap_or("-"),
        )
    }
}

/// `CAR-` + truncated SHA256 of owner, nanosecond timestamp and a random nonce
pub fn generate_car_id<R: Rng + ?Sized>(owner: &str, rng: &mut R) -> String {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros());
    let nonce: u64 = rng.gen();
    let mut hasher = Sha256::new();
    hasher.update(owner.as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(nonce.to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", CAR_ID_PREFIX, &digest[..CAR_ID_HEX_LEN])
}
