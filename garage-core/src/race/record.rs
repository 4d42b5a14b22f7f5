//! Race records — append-only history of finished races

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const RACE_ID_PREFIX: &str = "RACE-";

/// Externally visible race result. Speeds are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    pub rank: usize,
    pub winner_id: String,
    pub participant_count: usize,
    pub prize_awarded: bool,
}

/// A finished race, as kept in the garage's race log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceRecord {
    pub race_id: String,
    pub car_id: String,
    pub owner: String,
    pub outcome: RaceOutcome,
    /// Ledger reference of the entry fee, when one was charged
    pub entry_tx: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RaceRecord {
    pub fn new(car_id: impl Into<String>, owner: impl Into<String>, outcome: RaceOutcome) -> Self {
        Self {
            race_id: format!("{}{}", RACE_ID_PREFIX, Uuid::new_v4().simple()),
            car_id: car_id.into(),
            owner: owner.into(),
            outcome,
            entry_tx: None,
            timestamp: Utc::now(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} | car={} | rank {}/{} | winner={}{}",
            self.race_id,
            self.car_id,
            self.outcome.rank,
            self.outcome.participant_count,
            self.outcome.winner_id,
            if self.outcome.prize_awarded { " | prize" } else { "" },
        )
    }
}
