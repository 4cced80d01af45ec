//! Bistable actuator trait
//!
//! A bistable (latching) solenoid holds either end position without current.
//! Moving it takes one short coil pulse in the polarity of the target
//! position; holding current is never applied.

use crate::time::Millis;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the two stable actuator positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Position {
    /// Position A (H-bridge IN1 high)
    #[default]
    A,
    /// Position B (H-bridge IN2 high)
    B,
}

impl Position {
    /// The other end position
    pub const fn opposite(self) -> Self {
        match self {
            Position::A => Position::B,
            Position::B => Position::A,
        }
    }

    /// Index for per-position arrays
    pub const fn index(self) -> usize {
        match self {
            Position::A => 0,
            Position::B => 1,
        }
    }

    /// Single-letter label
    pub const fn label(self) -> &'static str {
        match self {
            Position::A => "A",
            Position::B => "B",
        }
    }
}

/// Errors that can occur with actuator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorError {
    /// A pulse is already in progress; nothing was changed
    Busy,
}

/// Trait for two-position pulse-driven actuators
///
/// Implementations own the coil outputs. The only way outputs are
/// de-energized is [`poll_pulse_complete`](Self::poll_pulse_complete)
/// observing that the pulse time has elapsed, which is also the only place
/// the reported [`position`](Self::position) changes.
pub trait BistableActuator {
    /// Start a pulse towards `position`
    ///
    /// Returns [`ActuatorError::Busy`] without touching outputs, position or
    /// timers when a pulse is already active.
    fn switch_to(
        &mut self,
        position: Position,
        duration_ms: u16,
        now: Millis,
    ) -> Result<(), ActuatorError>;

    /// Finish the pulse if its duration has elapsed
    ///
    /// Must be called every control-loop tick. Returns whether a pulse is
    /// still active after the update.
    fn poll_pulse_complete(&mut self, now: Millis) -> bool;

    /// Check if a pulse is in progress (without updating)
    fn is_pulse_active(&self) -> bool;

    /// Check if the bridge enable line is currently driven
    fn is_enabled(&self) -> bool;

    /// Last position a completed pulse drove the actuator to
    ///
    /// `None` until the first pulse completes.
    fn position(&self) -> Option<Position>;

    /// Estimated coil current in mA
    ///
    /// Ohm's-law estimate from supply voltage (mV) and coil resistance (mΩ);
    /// 0 when the bridge is disabled. Diagnostic only.
    fn estimate_current_ma(&self, supply_mv: u32, coil_resistance_mohm: u32) -> u16 {
        if !self.is_enabled() {
            return 0;
        }
        ohms_law_current_ma(supply_mv, coil_resistance_mohm)
    }
}

/// I = U / R, in mA from mV and mΩ, saturating at `u16::MAX`
pub fn ohms_law_current_ma(supply_mv: u32, coil_resistance_mohm: u32) -> u16 {
    let current = (supply_mv as u64 * 1000)
        .checked_div(coil_resistance_mohm as u64)
        .unwrap_or(u64::MAX);
    current.min(u16::MAX as u64) as u16
}
