//! Speed scoring
//!
//! The weighted attribute sum is mapped linearly from an assumed domain of
//! [100, 900] onto [150, 350] and clamped. A weighted sum of values in
//! [1, 999] can fall outside that domain, so the clamp is load-bearing.

use super::Car;
use crate::config::SpeedConfig;

#[derive(Debug, Clone, Default)]
pub struct SpeedModel {
    pub config: SpeedConfig,
}

impl SpeedModel {
    pub fn new(config: SpeedConfig) -> Self {
        Self { config }
    }

    /// Pure score of a car's attributes and weights
    pub fn score(&self, car: &Car) -> f64 {
        let raw = car.weights.apply(&car.attributes);
        self.map_raw(raw)
    }

    /// Score, reusing and refreshing the car's cache
    pub fn score_cached(&self, car: &mut Car) -> f64 {
        if let Some(speed) = car.cached_speed {
            return speed;
        }
        let speed = self.score(car);
        car.cached_speed = Some(speed);
        speed
    }

    pub fn map_raw(&self, raw: f64) -> f64 {
        let c = &self.config;
        let scaled = c.target_min
            + (raw - c.domain_min) * (c.target_max - c.target_min) / (c.domain_max - c.domain_min);
        scaled.clamp(c.target_min, c.target_max)
    }
}
