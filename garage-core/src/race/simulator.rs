//! Race simulator
//!
//! A race is one principal car against 3..=7 synthetic opponents. The
//! principal is inserted first and the field is stable-sorted by
//! descending speed, so a tie with an opponent goes to the principal.

use super::{RaceOutcome, RaceRecord};
use crate::car::{Car, SpeedModel};
use crate::config::RaceConfig;
use rand::Rng;

/// One entrant on the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: String,
    pub speed: f64,
    pub is_principal: bool,
}

impl Participant {
    pub fn opponent(n: usize, speed: f64) -> Self {
        Self {
            id: format!("AI-{}", n),
            speed,
            is_principal: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RaceSimulator {
    pub config: RaceConfig,
    pub speed: SpeedModel,
}

impl RaceSimulator {
    pub fn new(config: RaceConfig, speed: SpeedModel) -> Self {
        Self { config, speed }
    }

    /// Sample the opponent field, labelled `AI-1`, `AI-2`, ...
    pub fn opponents<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Participant> {
        let c = &self.config;
        let count = rng.gen_range(c.min_opponents..=c.max_opponents);
        (1..=count)
            .map(|n| {
                let speed = rng.gen_range(c.opponent_speed_min..c.opponent_speed_max);
                Participant::opponent(n, speed)
            })
            .collect()
    }

    /// Race `car` against a freshly sampled field
    pub fn race<R: Rng + ?Sized>(&self, car: &mut Car, rng: &mut R) -> RaceRecord {
        let opponents = self.opponents(rng);
        self.race_against(car, opponents)
    }

    /// Race `car` against a given field; refreshes the car's speed cache
    pub fn race_against(&self, car: &mut Car, opponents: Vec<Participant>) -> RaceRecord {
        let speed = self.speed.score_cached(car);
        let outcome = rank_participants(&car.id, speed, opponents);
        RaceRecord::new(car.id.clone(), car.owner.clone(), outcome)
    }
}

/// Rank the principal against the opponents.
///
/// rank = 1 + number of opponents strictly faster than the principal.
pub fn rank_participants(
    principal_id: &str,
    principal_speed: f64,
    opponents: Vec<Participant>,
) -> RaceOutcome {
    let mut grid = Vec::with_capacity(opponents.len() + 1);
    grid.push(Participant {
        id: principal_id.to_string(),
        speed: principal_speed,
        is_principal: true,
    });
    grid.extend(opponents);

    // sort_by is stable
    grid.sort_by(|a, b| b.speed.total_cmp(&a.speed));

    let rank = grid
        .iter()
        .position(|p| p.is_principal)
        .map(|i| i + 1)
        .unwrap_or(grid.len());
    let winner_id = grid[0].id.clone();

    RaceOutcome {
        rank,
        winner_id,
        participant_count: grid.len(),
        prize_awarded: rank == 1,
    }
}
