//! Position sensor implementations

pub mod hall;

pub use hall::{HallSensor, HallSensorPair};
