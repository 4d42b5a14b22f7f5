//! Garage — registry of cars per owner plus the race log
//!
//! The garage is the only place car state changes. Cars are inserted, never
//! removed; training inserts a derivative next to its source.
//! Snapshots persist as JSON.

use crate::car::Car;
use crate::error::{GarageError, Result};
use crate::race::RaceRecord;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Attempts at drawing a fresh id before giving up
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Garage {
    cars: HashMap<String, Car>,
    /// owner -> car ids in creation order
    owners: HashMap<String, Vec<String>>,
    races: Vec<RaceRecord>,
    pub metadata: GarageMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarageMetadata {
    pub created_at: DateTime<Utc>,
    pub total_cars_ever: u64,
    pub total_trainings: u64,
    pub total_races: u64,
}

impl Default for GarageMetadata {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            total_cars_ever: 0,
            total_trainings: 0,
            total_races: 0,
        }
    }
}

impl Garage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot, or start empty when the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No garage snapshot at {}, starting fresh", path.display());
            return Ok(Self::new());
        }
        Self::load(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let garage: Self = serde_json::from_str(&json)?;
        garage.check_integrity()?;
        info!("Loaded garage with {} cars from {}", garage.cars.len(), path.as_ref().display());
        Ok(garage)
    }

    /// Reject snapshots whose cars or owner index break the registry rules
    fn check_integrity(&self) -> Result<()> {
        let corrupt = |msg: String| Err(GarageError::Storage(format!("corrupt snapshot: {}", msg)));
        for (id, car) in &self.cars {
            if *id != car.id {
                return corrupt(format!("car {} stored under key {}", car.id, id));
            }
            if !car.attributes.in_bounds() {
                return corrupt(format!("car {} has attributes outside [1, 999]", id));
            }
            let w = car.weights.values();
            if w.iter().any(|x| !x.is_finite() || *x <= 0.0) || (car.weights.sum() - 1.0).abs() > 1e-9 {
                return corrupt(format!("car {} has invalid weights", id));
            }
            if car.cached_speed.is_some_and(|s| !s.is_finite()) {
                return corrupt(format!("car {} has a non-finite cached speed", id));
            }
        }
        let mut indexed = HashSet::new();
        for (owner, ids) in &self.owners {
            for id in ids {
                match self.cars.get(id) {
                    Some(car) if car.owner == *owner => {}
                    Some(_) => return corrupt(format!("car {} indexed under wrong owner {}", id, owner)),
                    None => return corrupt(format!("owner {} lists unknown car {}", owner, id)),
                }
                if !indexed.insert(id.as_str()) {
                    return corrupt(format!("car {} indexed twice", id));
                }
            }
        }
        if indexed.len() != self.cars.len() {
            return corrupt(format!(
                "{} cars stored but {} indexed by owner",
                self.cars.len(),
                indexed.len()
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        debug!("Saved garage snapshot to {}", path.as_ref().display());
        Ok(())
    }

    /// Create and register a fresh car for `owner`
    pub fn create_car<R: Rng + ?Sized>(&mut self, owner: &str, rng: &mut R) -> Result<Car> {
        let mut car = Car::new(owner, rng);
        let mut attempts = 1;
        while self.cars.contains_key(&car.id) {
            if attempts >= MAX_ID_ATTEMPTS {
                return Err(GarageError::DuplicateId(car.id));
            }
            car.id = crate::car::generate_car_id(owner, rng);
            attempts += 1;
        }
        self.insert(car.clone())?;
        Ok(car)
    }

    /// Register a car. Ids are never reused.
    pub fn insert(&mut self, car: Car) -> Result<()> {
        if self.cars.contains_key(&car.id) {
            return Err(GarageError::DuplicateId(car.id));
        }
        self.owners
            .entry(car.owner.clone())
            .or_default()
            .push(car.id.clone());
        self.metadata.total_cars_ever += 1;
        self.cars.insert(car.id.clone(), car);
        Ok(())
    }

    /// Register a training derivative under its source's owner
    pub fn record_derivative(&mut self, source_id: &str, car: Car) -> Result<()> {
        let source = self
            .cars
            .get(source_id)
            .ok_or_else(|| GarageError::NotFound(source_id.to_string()))?;
        if source.owner != car.owner {
            return Err(GarageError::NotOwner {
                car_id: source_id.to_string(),
                caller: car.owner,
            });
        }
        self.insert(car)?;
        self.metadata.total_trainings += 1;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Car> {
        self.cars.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cars.contains_key(id)
    }

    /// Cars owned by `owner`, oldest first
    pub fn get_by_owner(&self, owner: &str) -> Vec<&Car> {
        self.owners
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| self.cars.get(id)).collect())
            .unwrap_or_default()
    }

    /// Memoize a computed speed. The only in-place change a car ever sees.
    pub fn cache_speed(&mut self, id: &str, speed: f64) -> Result<()> {
        let car = self
            .cars
            .get_mut(id)
            .ok_or_else(|| GarageError::NotFound(id.to_string()))?;
        car.cached_speed = Some(speed);
        Ok(())
    }

    pub fn record_race(&mut self, record: RaceRecord) {
        self.metadata.total_races += 1;
        self.races.push(record);
    }

    pub fn races(&self) -> &[RaceRecord] {
        &self.races
    }

    pub fn races_for_owner(&self, owner: &str) -> Vec<&RaceRecord> {
        self.races.iter().filter(|r| r.owner == owner).collect()
    }

    pub fn count(&self) -> usize {
        self.cars.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Garage | {} cars | {} owners | {} trainings | {} races",
            self.cars.len(),
            self.owners.len(),
            self.metadata.total_trainings,
            self.races.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::TrainingEngine;
    use crate::race::RaceOutcome;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_create_and_list_in_order() {
        let mut garage = Garage::new();
        let mut rng = StdRng::seed_from_u64(41);
        let a = garage.create_car("rAlice", &mut rng).unwrap();
        let b = garage.create_car("rAlice", &mut rng).unwrap();
        garage.create_car("rBob", &mut rng).unwrap();

        let ids: Vec<&str> = garage.get_by_owner("rAlice").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
        assert_eq!(garage.get_by_owner("rBob").len(), 1);
        assert!(garage.get_by_owner("rNobody").is_empty());
        assert_eq!(garage.metadata.total_cars_ever, 3);
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut garage = Garage::new();
        let mut rng = StdRng::seed_from_u64(42);
        let car = garage.create_car("rAlice", &mut rng).unwrap();
        let err = garage.insert(car.clone()).unwrap_err();
        assert!(matches!(err, GarageError::DuplicateId(id) if id == car.id));
        assert_eq!(garage.count(), 1);
    }

    #[test]
    fn test_derivative_keeps_source() {
        let mut garage = Garage::new();
        let mut rng = StdRng::seed_from_u64(43);
        let source = garage.create_car("rAlice", &mut rng).unwrap();
        let (derived, _) = TrainingEngine::default().train(&source, Some(&[2][..]), &mut rng).unwrap();
        garage.record_derivative(&source.id, derived.clone()).unwrap();

        let stored = garage.get(&source.id).unwrap();
        assert_eq!(stored.attributes, source.attributes);
        assert_eq!(stored.generation_count, 0);
        assert_eq!(garage.get(&derived.id).unwrap().generation_count, 1);
        assert_eq!(garage.get_by_owner("rAlice").len(), 2);
        assert_eq!(garage.metadata.total_trainings, 1);
    }

    #[test]
    fn test_derivative_of_missing_source() {
        let mut garage = Garage::new();
        let mut rng = StdRng::seed_from_u64(44);
        let car = Car::new("rAlice", &mut rng);
        assert!(matches!(
            garage.record_derivative("CAR-missing", car),
            Err(GarageError::NotFound(_))
        ));
        assert_eq!(garage.count(), 0);
    }

    #[test]
    fn test_derivative_must_share_owner() {
        let mut garage = Garage::new();
        let mut rng = StdRng::seed_from_u64(45);
        let source = garage.create_car("rAlice", &mut rng).unwrap();
        let stranger = Car::new("rMallory", &mut rng);
        assert!(matches!(
            garage.record_derivative(&source.id, stranger),
            Err(GarageError::NotOwner { .. })
        ));
        assert!(garage.get_by_owner("rMallory").is_empty());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut garage = Garage::new();
        let mut rng = StdRng::seed_from_u64(46);
        let car = garage.create_car("rAlice", &mut rng).unwrap();
        garage.cache_speed(&car.id, 222.5).unwrap();
        garage.record_race(RaceRecord::new(
            car.id.clone(),
            "rAlice",
            RaceOutcome {
                rank: 1,
                winner_id: car.id.clone(),
                participant_count: 4,
                prize_awarded: true,
            },
        ));

        let path = std::env::temp_dir().join(format!("garage-test-{}.json", uuid::Uuid::new_v4()));
        garage.save(&path).unwrap();
        let loaded = Garage::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let restored = loaded.get(&car.id).unwrap();
        assert_eq!(restored.attributes, car.attributes);
        assert_eq!(restored.cached_speed, Some(222.5));
        assert_eq!(loaded.races_for_owner("rAlice").len(), 1);
        assert_eq!(loaded.metadata.total_races, 1);
    }

    #[test]
    fn test_snapshot_keeps_float_bits() {
        let mut garage = Garage::new();
        let mut rng = StdRng::seed_from_u64(47);
        let model = crate::car::SpeedModel::default();
        for i in 0..2000 {
            let car = garage.create_car(&format!("rOwner{}", i % 7), &mut rng).unwrap();
            garage.cache_speed(&car.id, model.score(&car)).unwrap();
        }

        let json = serde_json::to_string_pretty(&garage).unwrap();
        let loaded: Garage = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.count(), garage.count());
        for (id, car) in &garage.cars {
            let restored = loaded.get(id).unwrap();
            for (a, b) in car.weights.values().iter().zip(restored.weights.values()) {
                assert_eq!(a.to_bits(), b.to_bits(), "weight of {} changed", id);
            }
            assert_eq!(
                car.cached_speed.map(f64::to_bits),
                restored.cached_speed.map(f64::to_bits)
            );
        }
    }

    fn write_snapshot(garage: &Garage) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("garage-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_string(garage).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_rejects_broken_snapshots() {
        let mut rng = StdRng::seed_from_u64(48);

        let mut bad_attrs = Garage::new();
        let car = bad_attrs.create_car("rAlice", &mut rng).unwrap();
        let mut json = serde_json::to_value(&bad_attrs).unwrap();
        json["cars"][&car.id]["attributes"][0] = serde_json::json!(0);
        let path = std::env::temp_dir().join(format!("garage-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, json.to_string()).unwrap();
        let result = Garage::open(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GarageError::Storage(_))));

        let mut bad_weights = Garage::new();
        let mut car = Car::new("rAlice", &mut rng);
        car.weights = crate::car::Weights::base();
        let mut json = serde_json::to_value(&car).unwrap();
        json["weights"][0] = serde_json::json!(0.9);
        bad_weights.insert(serde_json::from_value(json).unwrap()).unwrap();
        let path = write_snapshot(&bad_weights);
        let result = Garage::open(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GarageError::Storage(_))));

        let mut orphan = Garage::new();
        orphan.create_car("rAlice", &mut rng).unwrap();
        orphan.owners.clear();
        let path = write_snapshot(&orphan);
        let result = Garage::open(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GarageError::Storage(_))));

        let mut stolen = Garage::new();
        let car = stolen.create_car("rAlice", &mut rng).unwrap();
        stolen.owners.clear();
        stolen.owners.insert("rMallory".to_string(), vec![car.id.clone()]);
        let path = write_snapshot(&stolen);
        let result = Garage::open(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GarageError::Storage(_))));
    }

    #[test]
    fn test_open_corrupt_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("garage-corrupt-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ \"cars\": ").unwrap();
        let result = Garage::open(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let path = std::env::temp_dir().join(format!("garage-missing-{}.json", uuid::Uuid::new_v4()));
        let garage = Garage::open(&path).unwrap();
        assert_eq!(garage.count(), 0);
    }
}
