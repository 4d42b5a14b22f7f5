//! Race Manager — the garage's public operations
//!
//! Ties the registry, the training engine, the speed model and the race
//! simulator to a payment gateway:
//! - ownership is checked before any payment is attempted
//! - paid operations commit only after the ledger confirms the payment
//! - mutations for one owner are serialized by a per-owner lock
//!
//! Hidden attributes, weights and speeds of opponents never leave this layer.

use crate::car::{generate_car_id, Car, CarView, SpeedModel, TrainingEngine};
use crate::config::GarageConfig;
use crate::error::{GarageError, Result};
use crate::garage::Garage;
use crate::payment::PaymentGateway;
use crate::race::{RaceOutcome, RaceRecord, RaceSimulator};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Result of a paid training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub car: CarView,
    pub generation_count: u64,
    pub trained_attributes: Vec<String>,
    pub tx_reference: String,
}

/// Result of a free speed test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTest {
    pub speed: f64,
    /// Faster than the car it was trained from
    pub improved: bool,
}

pub struct RaceManager<P> {
    pub config: GarageConfig,
    garage: RwLock<Garage>,
    payments: P,
    owner_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    rng: Mutex<StdRng>,
    trainer: TrainingEngine,
    speed: SpeedModel,
    simulator: RaceSimulator,
}

impl<P: PaymentGateway> RaceManager<P> {
    pub fn new(config: GarageConfig, payments: P) -> Self {
        Self::with_garage(config, Garage::new(), payments)
    }

    pub fn with_garage(config: GarageConfig, garage: Garage, payments: P) -> Self {
        let speed = SpeedModel::new(config.speed.clone());
        Self {
            trainer: TrainingEngine::new(config.training.clone()),
            simulator: RaceSimulator::new(config.race.clone(), speed.clone()),
            speed,
            config,
            garage: RwLock::new(garage),
            payments,
            owner_locks: Mutex::new(HashMap::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Make every random draw reproducible
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn payments(&self) -> &P {
        &self.payments
    }

    /// Pay the creation fee, then register a fresh car
    pub async fn create_car(&self, owner: &str, credential: &str) -> Result<CarView> {
        let lock = self.owner_lock(owner).await;
        let result = {
            let _guard = lock.lock().await;
            self.create_locked(owner, credential).await
        };
        self.release_owner_lock(owner, lock).await;
        result
    }

    async fn create_locked(&self, owner: &str, credential: &str) -> Result<CarView> {
        let tx = self.charge(credential, self.config.pricing.create_cost, "create").await?;

        let mut garage = self.garage.write().await;
        let mut rng = self.rng.lock().await;
        let car = garage.create_car(owner, &mut *rng)?;
        info!("Created car {} for {} (tx {})", car.id, owner, tx);
        Ok(car.view())
    }

    /// Cars owned by `owner`, oldest first
    pub async fn list_garage(&self, owner: &str) -> Vec<CarView> {
        let garage = self.garage.read().await;
        garage.get_by_owner(owner).into_iter().map(Car::view).collect()
    }

    pub async fn get_car(&self, car_id: &str) -> Result<CarView> {
        let garage = self.garage.read().await;
        garage
            .get(car_id)
            .map(Car::view)
            .ok_or_else(|| GarageError::NotFound(car_id.to_string()))
    }

    /// Pay the training fee, then register a trained derivative of `car_id`.
    ///
    /// `indices` selects attributes by position; `None` or empty trains all.
    pub async fn train(
        &self,
        car_id: &str,
        owner: &str,
        credential: &str,
        indices: Option<&[usize]>,
    ) -> Result<TrainOutcome> {
        TrainingEngine::select(indices)?;

        let lock = self.owner_lock(owner).await;
        let result = {
            let _guard = lock.lock().await;
            self.train_locked(car_id, owner, credential, indices).await
        };
        self.release_owner_lock(owner, lock).await;
        result
    }

    async fn train_locked(
        &self,
        car_id: &str,
        owner: &str,
        credential: &str,
        indices: Option<&[usize]>,
    ) -> Result<TrainOutcome> {
        let source = self.owned_car(car_id, owner).await?;
        let tx = self.charge(credential, self.config.pricing.train_cost, "train").await?;

        let mut garage = self.garage.write().await;
        let mut rng = self.rng.lock().await;
        let (mut derived, log) = self.trainer.train(&source, indices, &mut *rng)?;
        while garage.contains(&derived.id) {
            derived.id = generate_car_id(owner, &mut *rng);
        }
        garage.record_derivative(&source.id, derived.clone())?;

        debug!("Training {} -> {}: {}", source.id, derived.id, log.summary());
        let trained_attributes: Vec<String> =
            log.trained().iter().map(|a| a.name().to_string()).collect();
        info!(
            "Trained car {} -> new car {} (generation {}, attributes: {})",
            source.id,
            derived.id,
            derived.generation_count,
            trained_attributes.join(", "),
        );
        Ok(TrainOutcome {
            generation_count: derived.generation_count,
            car: derived.view(),
            trained_attributes,
            tx_reference: tx,
        })
    }

    /// Free speed test. `improved` compares against the parent generation.
    pub async fn test_speed(&self, car_id: &str, owner: &str) -> Result<SpeedTest> {
        let mut garage = self.garage.write().await;
        let mut car = Self::check_owner(&garage, car_id, owner)?.clone();
        let speed = self.speed.score_cached(&mut car);
        garage.cache_speed(&car.id, speed)?;

        let parent_speed = match car.parent_id.as_deref() {
            Some(parent_id) => match garage.get(parent_id) {
                Some(parent) => {
                    let mut parent = parent.clone();
                    let s = self.speed.score_cached(&mut parent);
                    garage.cache_speed(&parent.id, s)?;
                    Some(s)
                }
                None => {
                    warn!("Parent {} of car {} is missing from the garage", parent_id, car.id);
                    None
                }
            },
            None => None,
        };
        let improved = parent_speed.is_some_and(|p| speed > p);
        info!("Speed test for car {}: improved={}", car.id, improved);
        Ok(SpeedTest { speed, improved })
    }

    /// Pay the entry fee, then race `car_id` against a synthetic field
    pub async fn enter_race(&self, car_id: &str, owner: &str, credential: &str) -> Result<RaceOutcome> {
        let lock = self.owner_lock(owner).await;
        let result = {
            let _guard = lock.lock().await;
            self.race_locked(car_id, owner, credential).await
        };
        self.release_owner_lock(owner, lock).await;
        result
    }

    async fn race_locked(&self, car_id: &str, owner: &str, credential: &str) -> Result<RaceOutcome> {
        let mut car = self.owned_car(car_id, owner).await?;
        let tx = self.charge(credential, self.config.pricing.race_cost, "race").await?;

        let mut record = {
            let mut rng = self.rng.lock().await;
            self.simulator.race(&mut car, &mut *rng)
        };
        record.entry_tx = Some(tx);
        self.commit_race(&car, record).await
    }

    /// Race log entries for `owner`, oldest first
    pub async fn race_history(&self, owner: &str) -> Vec<RaceRecord> {
        let garage = self.garage.read().await;
        garage.races_for_owner(owner).into_iter().cloned().collect()
    }

    pub async fn balance(&self, address: &str) -> Result<f64> {
        Ok(self.payments.get_balance(address).await?)
    }

    /// Persist the registry to the configured store path
    pub async fn save(&self) -> Result<()> {
        let garage = self.garage.read().await;
        garage.save(&self.config.store_path)?;
        info!("Saved {} to {}", garage.summary(), self.config.store_path);
        Ok(())
    }

    pub async fn summary(&self) -> String {
        self.garage.read().await.summary()
    }

    async fn commit_race(&self, car: &Car, record: RaceRecord) -> Result<RaceOutcome> {
        let mut garage = self.garage.write().await;
        if let Some(speed) = car.cached_speed {
            garage.cache_speed(&car.id, speed)?;
        }
        let outcome = record.outcome.clone();
        info!("Race finished: {}", record.summary());
        garage.record_race(record);
        Ok(outcome)
    }

    async fn charge(&self, credential: &str, amount: f64, purpose: &str) -> Result<String> {
        match self.payments.process_payment(credential, amount).await {
            Ok(tx) => Ok(tx),
            Err(e) => {
                warn!("Payment for {} declined: {}", purpose, e);
                Err(GarageError::PaymentFailed(e))
            }
        }
    }

    async fn owned_car(&self, car_id: &str, owner: &str) -> Result<Car> {
        let garage = self.garage.read().await;
        Self::check_owner(&garage, car_id, owner).cloned()
    }

    fn check_owner<'g>(garage: &'g Garage, car_id: &str, owner: &str) -> Result<&'g Car> {
        let car = garage
            .get(car_id)
            .ok_or_else(|| GarageError::NotFound(car_id.to_string()))?;
        if !car.is_owned_by(owner) {
            return Err(GarageError::NotOwner {
                car_id: car_id.to_string(),
                caller: owner.to_string(),
            });
        }
        Ok(car)
    }

    async fn owner_lock(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut locks = self.owner_locks.lock().await;
        locks.entry(owner.to_string()).or_default().clone()
    }

    /// Drop the owner's entry once no other task holds or waits on it
    async fn release_owner_lock(&self, owner: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.owner_locks.lock().await;
        drop(lock);
        if locks.get(owner).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(owner);
        }
    }
}
