//! Hardware driver implementations
//!
//! Concrete implementations of the detent-core traits on top of the
//! detent-hal pin abstractions:
//!
//! - Solenoid driver (L298N-style H-bridge, two direction inputs plus enable)
//! - Position sensors (AH3134-style open-collector hall switches)

#![no_std]
#![deny(unsafe_code)]

pub mod sensor;
pub mod solenoid;
