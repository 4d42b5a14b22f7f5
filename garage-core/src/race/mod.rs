//! Races — synthetic opponents, ranking and the race log

mod record;
mod simulator;

pub use record::{RaceOutcome, RaceRecord, RACE_ID_PREFIX};
pub use simulator::{rank_participants, Participant, RaceSimulator};
