//! Board-agnostic core logic for the solenoid verification firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (actuator, position sensors, motion guard)
//! - Single-shot switch verification
//! - Endurance test engine and its statistics
//! - Controller context tying one tick of the control loop together
//! - Configuration types and the `machine.toml` parser
//! - Status record for the request layer
//!
//! Every component is polled. Nothing here sleeps, spins or allocates; the
//! caller supplies a monotonic millisecond timestamp on every call.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod endurance;
pub mod status;
pub mod time;
pub mod traits;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{CommandError, SolenoidController, TickOutput};
pub use status::StatusReport;
pub use traits::{Position, SensorId};
