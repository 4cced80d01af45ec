//! Hardware abstraction traits
//!
//! These traits define the interface between the verification logic
//! and hardware-specific implementations.

pub mod actuator;
pub mod motion;
pub mod sensor;

pub use actuator::{ActuatorError, BistableActuator, Position};
pub use motion::{MotionGuard, Stationary};
pub use sensor::{PositionSensors, SensorId, SensorReading, SensorSnapshot};
