//! Garage configuration — prices, training bounds, speed mapping, race setup
//!
//! Everything has a sensible default; a JSON file can override any part of it.

use crate::error::{GarageError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable pointing at a JSON config file
pub const CONFIG_ENV: &str = "GARAGE_CONFIG";
/// Environment variable overriding the registry snapshot path
pub const STORE_ENV: &str = "GARAGE_STORE";
/// Largest training delta that can still move an attribute across its whole range
pub const MAX_TRAINING_DELTA: i32 = 998;

/// Prices in XRP for the paid operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub create_cost: f64,
    pub train_cost: f64,
    pub race_cost: f64,
    /// Advertised prize for a win. Payouts are settled outside the core.
    pub race_prize: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            create_cost: 1.0,
            train_cost: 1.0,
            race_cost: 1.0,
            race_prize: 100.0,
        }
    }
}

/// Bounds on training mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Deltas are drawn uniformly from [-max_delta, max_delta]
    pub max_delta: i32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self { max_delta: 20 }
    }
}

/// Linear mapping from the weighted attribute sum to a speed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub domain_min: f64,
    pub domain_max: f64,
    pub target_min: f64,
    pub target_max: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            domain_min: 100.0,
            domain_max: 900.0,
            target_min: 150.0,
            target_max: 350.0,
        }
    }
}

/// Opponent generation for races
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub min_opponents: usize,
    pub max_opponents: usize,
    /// Opponent speeds are drawn from [opponent_speed_min, opponent_speed_max)
    pub opponent_speed_min: f64,
    pub opponent_speed_max: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            min_opponents: 3,
            max_opponents: 7,
            opponent_speed_min: 30.0,
            opponent_speed_max: 70.0,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GarageConfig {
    pub pricing: PricingConfig,
    pub training: TrainingConfig,
    pub speed: SpeedConfig,
    pub race: RaceConfig,
    /// Ledger address that receives every payment
    pub treasury_address: String,
    /// Registry snapshot file
    pub store_path: String,
}

impl Default for GarageConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            training: TrainingConfig::default(),
            speed: SpeedConfig::default(),
            race: RaceConfig::default(),
            treasury_address: "rGarageTreasury".to_string(),
            store_path: "garage-store.json".to_string(),
        }
    }
}

impl GarageConfig {
    /// Load from a JSON file; missing fields fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!("Loaded garage config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Defaults, overridden by `GARAGE_CONFIG` and `GARAGE_STORE` when set
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        if let Ok(store) = std::env::var(STORE_ENV) {
            config.store_path = store;
        }
        Ok(config)
    }

    /// Reject ranges the engine cannot sample from
    pub fn validate(&self) -> Result<()> {
        let p = &self.pricing;
        if [p.create_cost, p.train_cost, p.race_cost, p.race_prize]
            .iter()
            .any(|c| !c.is_finite() || *c < 0.0)
        {
            return Err(GarageError::InvalidInput("prices must be finite and non-negative".into()));
        }
        if !(0..=MAX_TRAINING_DELTA).contains(&self.training.max_delta) {
            return Err(GarageError::InvalidInput(format!(
                "max_delta must be within 0..={}",
                MAX_TRAINING_DELTA
            )));
        }
        let s = &self.speed;
        if s.domain_max <= s.domain_min || s.target_max <= s.target_min {
            return Err(GarageError::InvalidInput("speed ranges must be increasing".into()));
        }
        let r = &self.race;
        if r.min_opponents == 0 || r.max_opponents < r.min_opponents {
            return Err(GarageError::InvalidInput(format!(
                "opponent count range {}..={} is empty",
                r.min_opponents, r.max_opponents
            )));
        }
        if r.opponent_speed_max <= r.opponent_speed_min {
            return Err(GarageError::InvalidInput("opponent speed range is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GarageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.training.max_delta, 20);
        assert_eq!(config.race.min_opponents, 3);
        assert_eq!(config.race.max_opponents, 7);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "pricing": { "race_cost": 2.5 }, "treasury_address": "rTreasury" }"#;
        let config: GarageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.pricing.race_cost, 2.5);
        assert_eq!(config.pricing.create_cost, 1.0);
        assert_eq!(config.treasury_address, "rTreasury");
        assert_eq!(config.speed.target_max, 350.0);
    }

    #[test]
    fn test_rejects_empty_opponent_range() {
        let mut config = GarageConfig::default();
        config.race.max_opponents = 2;
        assert!(matches!(config.validate(), Err(GarageError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_negative_price() {
        let mut config = GarageConfig::default();
        config.pricing.train_cost = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_delta_bounds() {
        let mut config = GarageConfig::default();
        config.training.max_delta = MAX_TRAINING_DELTA;
        assert!(config.validate().is_ok());
        config.training.max_delta = i32::MAX;
        assert!(matches!(config.validate(), Err(GarageError::InvalidInput(_))));
        config.training.max_delta = -1;
        assert!(config.validate().is_err());
    }
}
