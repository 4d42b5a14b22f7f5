//! Car — hidden attributes, training generations and speed scoring

mod attributes;
mod entity;
mod speed;
mod training;

pub use attributes::{
    Attribute, Attributes, Weights, ATTRIBUTE_COUNT, ATTRIBUTE_MAX, ATTRIBUTE_MIN, BASE_WEIGHTS,
    WEIGHT_NOISE,
};
pub use entity::{generate_car_id, Car, CarView, CAR_ID_HEX_LEN, CAR_ID_PREFIX};
pub use speed::SpeedModel;
pub use training::{AttributeChange, ChangeLog, TrainingEngine};
