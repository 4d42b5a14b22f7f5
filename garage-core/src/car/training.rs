//! Training — derive a new car generation from an existing one
//!
//! Training copies the source car, nudges the selected attributes by a
//! bounded random delta and hands back the derivative together with a
//! change log. The source car is never touched.

use super::{generate_car_id, Attribute, Car};
use crate::config::TrainingConfig;
use crate::error::{GarageError, Result};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One attribute's movement during a training run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub attribute: Attribute,
    pub old: u16,
    pub delta: i32,
    pub new: u16,
}

/// Audit record of a training run. Internal only, never sent to callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeLog {
    pub changes: Vec<AttributeChange>,
}

impl ChangeLog {
    pub fn trained(&self) -> Vec<Attribute> {
        self.changes.iter().map(|c| c.attribute).collect()
    }

    pub fn summary(&self) -> String {
        self.changes
            .iter()
            .map(|c| format!("{} {}{:+}={}", c.attribute, c.old, c.delta, c.new))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Applies bounded random deltas to selected attributes
#[derive(Debug, Clone, Default)]
pub struct TrainingEngine {
    pub config: TrainingConfig,
}

impl TrainingEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Resolve requested indices to attributes.
    ///
    /// `None` or an empty list selects all ten. Any index outside [0, 9]
    /// rejects the whole request; repeated indices are trained once.
    pub fn select(indices: Option<&[usize]>) -> Result<Vec<Attribute>> {
        let indices = match indices {
            Some(idx) if !idx.is_empty() => idx,
            _ => return Ok(Attribute::ALL.to_vec()),
        };
        let mut selected: Vec<Attribute> = Vec::with_capacity(indices.len());
        for &i in indices {
            let attribute = Attribute::from_index(i).ok_or_else(|| {
                GarageError::InvalidInput(format!("attribute index {} is outside 0..=9", i))
            })?;
            if !selected.contains(&attribute) {
                selected.push(attribute);
            }
        }
        Ok(selected)
    }

    /// Derive a trained car from `source`.
    pub fn train<R: Rng + ?Sized>(
        &self,
        source: &Car,
        indices: Option<&[usize]>,
        rng: &mut R,
    ) -> Result<(Car, ChangeLog)> {
        let selected = Self::select(indices)?;
        let max = self.config.max_delta;

        let mut attributes = source.attributes.clone();
        let mut log = ChangeLog::default();
        for attribute in selected {
            let old = attributes.get(attribute);
            let delta = rng.gen_range(-max..=max);
            let new = attributes.adjust(attribute, delta);
            log.changes.push(AttributeChange { attribute, old, delta, new });
        }

        let now = Utc::now();
        let derived = Car {
            id: generate_car_id(&source.owner, rng),
            owner: source.owner.clone(),
            attributes,
            weights: source.weights.clone(),
            generation_count: source.generation_count + 1,
            parent_id: Some(source.id.clone()),
            created_at: now,
            last_trained_at: Some(now),
            cached_speed: None,
        };
        Ok((derived, log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::{Attributes, Weights};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixture() -> Car {
        let mut car = Car::with_parts(
            "CAR-fixture",
            "rOwner",
            Attributes::from_values([1, 999, 500, 400, 300, 200, 100, 50, 25, 10]),
            Weights::base(),
        );
        car.cached_speed = Some(200.0);
        car
    }

    #[test]
    fn test_select_all_when_absent_or_empty() {
        assert_eq!(TrainingEngine::select(None).unwrap().len(), 10);
        assert_eq!(TrainingEngine::select(Some(&[][..])).unwrap().len(), 10);
    }

    #[test]
    fn test_select_rejects_out_of_range() {
        let err = TrainingEngine::select(Some(&[2, 10][..])).unwrap_err();
        assert!(matches!(err, GarageError::InvalidInput(_)));
    }

    #[test]
    fn test_select_dedups() {
        let selected = TrainingEngine::select(Some(&[2, 2, 0][..])).unwrap();
        assert_eq!(selected, vec![Attribute::Engine, Attribute::Tyres]);
    }

    #[test]
    fn test_train_single_index_changes_only_that_attribute() {
        let engine = TrainingEngine::default();
        let mut rng = StdRng::seed_from_u64(11);
        let source = fixture();
        for _ in 0..200 {
            let (derived, log) = engine.train(&source, Some(&[2][..]), &mut rng).unwrap();
            for a in Attribute::ALL {
                if a != Attribute::Engine {
                    assert_eq!(derived.attributes.get(a), source.attributes.get(a));
                }
            }
            assert_eq!(log.trained(), vec![Attribute::Engine]);
            let diff = i32::from(derived.attributes.get(Attribute::Engine)) - 500;
            assert!(diff.abs() <= 20);
        }
    }

    #[test]
    fn test_train_preserves_source_and_lineage() {
        let engine = TrainingEngine::default();
        let mut rng = StdRng::seed_from_u64(12);
        let source = fixture();
        let before = source.clone();
        let (derived, _) = engine.train(&source, None, &mut rng).unwrap();

        assert_eq!(source.attributes, before.attributes);
        assert_eq!(source.id, before.id);
        assert_eq!(source.cached_speed, Some(200.0));

        assert_ne!(derived.id, source.id);
        assert_eq!(derived.owner, source.owner);
        assert_eq!(derived.generation_count, source.generation_count + 1);
        assert_eq!(derived.parent_id.as_deref(), Some("CAR-fixture"));
        assert!(derived.last_trained_at.is_some());
        assert!(derived.cached_speed.is_none());
        // bit-identical weights
        for (a, b) in derived.weights.values().iter().zip(source.weights.values()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_train_clamps_at_bounds() {
        let engine = TrainingEngine::default();
        let mut rng = StdRng::seed_from_u64(13);
        let mut car = fixture();
        for _ in 0..500 {
            let (next, log) = engine.train(&car, Some(&[0, 1][..]), &mut rng).unwrap();
            assert!(next.attributes.in_bounds());
            for c in &log.changes {
                let expected = (i32::from(c.old) + c.delta).clamp(1, 999);
                assert_eq!(i32::from(c.new), expected);
                assert!((-20..=20).contains(&c.delta));
            }
            car = next;
        }
        assert_eq!(car.generation_count, 500);
    }

    #[test]
    fn test_zero_max_delta_is_identity() {
        let engine = TrainingEngine::new(TrainingConfig { max_delta: 0 });
        let mut rng = StdRng::seed_from_u64(14);
        let source = fixture();
        let (derived, log) = engine.train(&source, None, &mut rng).unwrap();
        assert_eq!(derived.attributes, source.attributes);
        assert!(log.changes.iter().all(|c| c.delta == 0));
    }
}
