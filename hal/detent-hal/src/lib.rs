//! Detent Hardware Abstraction Layer
//!
//! This crate defines the GPIO traits the solenoid and sensor drivers are
//! written against. Chip HALs plug in through the [`eh`] adapters, which
//! wrap any infallible `embedded-hal` 1.0 pin.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  detent-drivers (H-bridge, hall pair)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  detent-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  embedded-hal 1.0 pins (embassy-rp...)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O

#![no_std]
#![deny(unsafe_code)]

pub mod eh;
pub mod gpio;

// Re-export key traits at crate root for convenience
pub use eh::{EhInput, EhOutput};
pub use gpio::{InputPin, OutputPin};
