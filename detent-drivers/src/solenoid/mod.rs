//! Solenoid driver implementations
//!
//! Bistable solenoids are driven through an H-bridge: the polarity of a
//! short pulse selects the end position.

pub mod hbridge;

pub use hbridge::HBridgeSolenoid;
