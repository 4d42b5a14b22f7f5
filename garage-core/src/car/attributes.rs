//! Hidden attribute vector and per-car scoring weights
//!
//! Every car carries ten integer attributes in [1, 999] and a weight vector
//! that sums to one. Neither is ever part of a public view.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ATTRIBUTE_COUNT: usize = 10;
pub const ATTRIBUTE_MIN: u16 = 1;
pub const ATTRIBUTE_MAX: u16 = 999;

/// Weights every car starts from before noise is applied
pub const BASE_WEIGHTS: [f64; ATTRIBUTE_COUNT] =
    [0.15, 0.12, 0.10, 0.08, 0.11, 0.09, 0.13, 0.07, 0.08, 0.07];

/// Maximum absolute noise added to each base weight
pub const WEIGHT_NOISE: f64 = 0.02;

/// Named car components, in attribute-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Tyres,
    Brakes,
    Engine,
    Aerodynamics,
    Suspension,
    Transmission,
    FuelSystem,
    Electronics,
    Chassis,
    Cooling,
}

impl Attribute {
    pub const ALL: [Attribute; ATTRIBUTE_COUNT] = [
        Attribute::Tyres,
        Attribute::Brakes,
        Attribute::Engine,
        Attribute::Aerodynamics,
        Attribute::Suspension,
        Attribute::Transmission,
        Attribute::FuelSystem,
        Attribute::Electronics,
        Attribute::Chassis,
        Attribute::Cooling,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Tyres => "tyres",
            Attribute::Brakes => "brakes",
            Attribute::Engine => "engine",
            Attribute::Aerodynamics => "aerodynamics",
            Attribute::Suspension => "suspension",
            Attribute::Transmission => "transmission",
            Attribute::FuelSystem => "fuel_system",
            Attribute::Electronics => "electronics",
            Attribute::Chassis => "chassis",
            Attribute::Cooling => "cooling",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The ten hidden attribute values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes([u16; ATTRIBUTE_COUNT]);

impl Attributes {
    /// Sample every attribute independently and uniformly from [1, 999]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut values = [0u16; ATTRIBUTE_COUNT];
        for v in values.iter_mut() {
            *v = rng.gen_range(ATTRIBUTE_MIN..=ATTRIBUTE_MAX);
        }
        Self(values)
    }

    /// Build from explicit values, clamping each into [1, 999]
    pub fn from_values(values: [u16; ATTRIBUTE_COUNT]) -> Self {
        Self(values.map(|v| v.clamp(ATTRIBUTE_MIN, ATTRIBUTE_MAX)))
    }

    pub fn get(&self, attribute: Attribute) -> u16 {
        self.0[attribute.index()]
    }

    pub fn values(&self) -> &[u16; ATTRIBUTE_COUNT] {
        &self.0
    }

    /// Apply a signed delta to one attribute, clamped. Returns the new value.
    pub fn adjust(&mut self, attribute: Attribute, delta: i32) -> u16 {
        let idx = attribute.index();
        let raw = i32::from(self.0[idx]).saturating_add(delta);
        let clamped = raw.clamp(i32::from(ATTRIBUTE_MIN), i32::from(ATTRIBUTE_MAX));
        // clamped is within u16 range by construction
        self.0[idx] = clamped as u16;
        self.0[idx]
    }

    pub fn in_bounds(&self) -> bool {
        self.0
            .iter()
            .all(|v| (ATTRIBUTE_MIN..=ATTRIBUTE_MAX).contains(v))
    }
}

/// Per-car scoring weights: strictly positive, summing to one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights([f64; ATTRIBUTE_COUNT]);

impl Weights {
    /// Perturb the base weights with uniform noise, then renormalize
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut w = BASE_WEIGHTS;
        for x in w.iter_mut() {
            *x += rng.gen_range(-WEIGHT_NOISE..=WEIGHT_NOISE);
        }
        Self::normalized(w)
    }

    /// The unperturbed base weights
    pub fn base() -> Self {
        Self::normalized(BASE_WEIGHTS)
    }

    fn normalized(mut w: [f64; ATTRIBUTE_COUNT]) -> Self {
        let total: f64 = w.iter().sum();
        for x in w.iter_mut() {
            *x /= total;
        }
        Self(w)
    }

    pub fn values(&self) -> &[f64; ATTRIBUTE_COUNT] {
        &self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Weighted sum of an attribute vector
    pub fn apply(&self, attributes: &Attributes) -> f64 {
        attributes
            .values()
            .iter()
            .zip(self.0.iter())
            .map(|(a, w)| f64::from(*a) * w)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_attribute_names_follow_index_order() {
        let names: Vec<&str> = Attribute::ALL.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "tyres", "brakes", "engine", "aerodynamics", "suspension",
                "transmission", "fuel_system", "electronics", "chassis", "cooling"
            ]
        );
        for (i, a) in Attribute::ALL.iter().enumerate() {
            assert_eq!(a.index(), i);
            assert_eq!(Attribute::from_index(i), Some(*a));
        }
        assert_eq!(Attribute::from_index(10), None);
    }

    #[test]
    fn test_random_attributes_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(Attributes::random(&mut rng).in_bounds());
        }
    }

    #[test]
    fn test_adjust_clamps() {
        let mut attrs = Attributes::from_values([1, 999, 500, 10, 10, 10, 10, 10, 10, 10]);
        assert_eq!(attrs.adjust(Attribute::Tyres, -20), 1);
        assert_eq!(attrs.adjust(Attribute::Brakes, 20), 999);
        assert_eq!(attrs.adjust(Attribute::Engine, -7), 493);
        assert_eq!(attrs.adjust(Attribute::Aerodynamics, i32::MAX), 999);
        assert_eq!(attrs.adjust(Attribute::Suspension, i32::MIN), 1);
        assert!(attrs.in_bounds());
    }

    #[test]
    fn test_from_values_clamps_zero() {
        let attrs = Attributes::from_values([0, 1000, 5, 5, 5, 5, 5, 5, 5, 5]);
        assert_eq!(attrs.get(Attribute::Tyres), 1);
        assert_eq!(attrs.get(Attribute::Brakes), 999);
    }

    #[test]
    fn test_weights_normalized_and_positive() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let w = Weights::generate(&mut rng);
            assert!((w.sum() - 1.0).abs() < 1e-9);
            assert!(w.values().iter().all(|x| *x > 0.0));
        }
    }

    #[test]
    fn test_weights_stay_near_base() {
        let mut rng = StdRng::seed_from_u64(3);
        let w = Weights::generate(&mut rng);
        for (x, base) in w.values().iter().zip(BASE_WEIGHTS.iter()) {
            // renormalization only shifts values slightly
            assert!((x - base).abs() < 0.07, "{} drifted from {}", x, base);
        }
    }

    #[test]
    fn test_apply_uniform_attributes() {
        let w = Weights::base();
        let attrs = Attributes::from_values([500; ATTRIBUTE_COUNT]);
        assert!((w.apply(&attrs) - 500.0).abs() < 1e-9);
    }
}
