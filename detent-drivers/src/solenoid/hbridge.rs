//! H-bridge solenoid driver
//!
//! Drives a latching solenoid through an L298N-style bridge channel:
//!
//! | Position | IN1 | IN2 | EN |
//! |----------|-----|-----|----|
//! | A        | H   | L   | on |
//! | B        | L   | H   | on |
//! | idle     | L   | L   | off|
//!
//! Direction inputs are set before the enable line is asserted, and the
//! enable line is released before the direction inputs are cleared.
//!
//! # Usage
//!
//! ```ignore
//! let mut solenoid = HBridgeSolenoid::new(in1, in2, ena, false);
//! solenoid.switch_to(Position::B, 100, now)?;
//!
//! // Every control-loop tick:
//! solenoid.poll_pulse_complete(now);
//! ```

use detent_core::config::SolenoidConfig;
use detent_core::time::{elapsed, Millis};
use detent_core::traits::{ActuatorError, BistableActuator, Position};
use detent_hal::OutputPin;

#[derive(Debug, Clone, Copy)]
struct ActivePulse {
    target: Position,
    started_at: Millis,
    duration_ms: u16,
}

/// H-bridge solenoid driver
pub struct HBridgeSolenoid<In1, In2, En> {
    in1: In1,
    in2: In2,
    en: En,
    /// If true, bridge enabled = EN pin LOW
    enable_inverted: bool,
    pulse: Option<ActivePulse>,
    position: Option<Position>,
}

impl<In1, In2, En> HBridgeSolenoid<In1, In2, En>
where
    In1: OutputPin,
    In2: OutputPin,
    En: OutputPin,
{
    /// Create a driver with all outputs de-energized
    ///
    /// The armature position is unknown until the first pulse completes.
    pub fn new(in1: In1, in2: In2, en: En, enable_inverted: bool) -> Self {
        let mut solenoid = Self {
            in1,
            in2,
            en,
            enable_inverted,
            pulse: None,
            position: None,
        };
        solenoid.de_energize();
        solenoid
    }

    /// Create a driver from the solenoid config
    pub fn from_config(in1: In1, in2: In2, en: En, config: &SolenoidConfig) -> Self {
        Self::new(in1, in2, en, config.enable_inverted)
    }

    fn set_enable(&mut self, on: bool) {
        self.en.set_state(on != self.enable_inverted);
    }

    fn energize(&mut self, position: Position) {
        match position {
            Position::A => {
                self.in1.set_high();
                self.in2.set_low();
            }
            Position::B => {
                self.in1.set_low();
                self.in2.set_high();
            }
        }
        self.set_enable(true);
    }

    fn de_energize(&mut self) {
        self.set_enable(false);
        self.in1.set_low();
        self.in2.set_low();
    }

    /// Position of the pulse in progress
    pub fn pulse_target(&self) -> Option<Position> {
        self.pulse.map(|p| p.target)
    }
}

impl<In1, In2, En> BistableActuator for HBridgeSolenoid<In1, In2, En>
where
    In1: OutputPin,
    In2: OutputPin,
    En: OutputPin,
{
    fn switch_to(
        &mut self,
        position: Position,
        duration_ms: u16,
        now: Millis,
    ) -> Result<(), ActuatorError> {
        if self.pulse.is_some() {
            return Err(ActuatorError::Busy);
        }

        self.energize(position);
        self.pulse = Some(ActivePulse {
            target: position,
            started_at: now,
            duration_ms,
        });
        Ok(())
    }

    fn poll_pulse_complete(&mut self, now: Millis) -> bool {
        let Some(pulse) = self.pulse else {
            return false;
        };

        if elapsed(now, pulse.started_at) >= pulse.duration_ms as u32 {
            self.de_energize();
            self.pulse = None;
            self.position = Some(pulse.target);
            return false;
        }
        true
    }

    fn is_pulse_active(&self) -> bool {
        self.pulse.is_some()
    }

    fn is_enabled(&self) -> bool {
        self.en.is_set_high() != self.enable_inverted
    }

    fn position(&self) -> Option<Position> {
        self.position
    }
}
