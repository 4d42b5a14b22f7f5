//! Garage Core — hidden-attribute racing cars on a paid ledger
//!
//! Cars carry ten hidden attributes and a private weight vector. Training
//! derives a new generation, speed is a bounded weighted score, and races
//! rank a car against synthetic opponents. Paid operations go through a
//! `PaymentGateway` before anything is committed.

pub mod car;
pub mod config;
pub mod error;
pub mod garage;
pub mod manager;
pub mod payment;
pub mod race;

pub use car::{Attribute, Car, CarView, SpeedModel, TrainingEngine};
pub use config::GarageConfig;
pub use error::{GarageError, Result};
pub use garage::Garage;
pub use manager::{RaceManager, SpeedTest, TrainOutcome};
pub use payment::{MockLedger, PaymentError, PaymentGateway};
pub use race::{RaceOutcome, RaceRecord, RaceSimulator};
