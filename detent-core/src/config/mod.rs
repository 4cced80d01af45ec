//! Configuration types and parsing
//!
//! The firmware embeds a `machine.toml`; [`parse_config`] turns it into a
//! validated [`MachineConfig`]. Defaults mirror the reference hardware: an
//! L298N bridge pulsing a 30 Ω latching solenoid from 24 V, with AH3134
//! hall sensors on both end positions.

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::{
    ConfigError, DirectionMode, HallSensorConfig, MachineConfig, MotionGuardConfig, PolicyError,
    SensorMapping, SolenoidConfig, TestPolicy, VerifyConfig, DEFAULT_MOTION_DEADBAND,
    DEFAULT_PULSE_MS, DEFAULT_SENSOR_TIMEOUT_MS, MAX_PULSE_MS,
};
pub use types::validate_pulse;
