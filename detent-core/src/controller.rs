//! Controller context
//!
//! One owned object holding the actuator, the sensors, the standalone
//! verifier, the endurance engine and the machine config. Every control-loop
//! iteration calls [`SolenoidController::tick`] exactly once, which polls in
//! a fixed order:
//!
//! 1. actuator pulse timer (de-energizes an expired pulse)
//! 2. position sensors
//! 3. standalone verifier
//! 4. endurance engine
//!
//! Manual commands and endurance sessions share one coil, so each refuses
//! to start while the other owns it.

use crate::config::{validate_pulse, MachineConfig, PolicyError, TestPolicy};
use crate::endurance::{StartError, TestEngine, TestEvent, TestReport};
use crate::status::StatusReport;
use crate::time::Millis;
use crate::traits::{
    ActuatorError, BistableActuator, MotionGuard, Position, PositionSensors, SensorSnapshot,
};
use crate::verify::{SwitchVerifier, VerifyError, VerifyPoll, VerifyRequest};

/// Reasons a manual command was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// A pulse is on the coil
    Busy,
    /// A manual verification has not resolved yet
    VerifyPending,
    /// An endurance session owns the actuator
    SessionRunning,
    /// Requested pulse length out of range
    InvalidPulse(PolicyError),
}

impl From<ActuatorError> for CommandError {
    fn from(e: ActuatorError) -> Self {
        match e {
            ActuatorError::Busy => CommandError::Busy,
        }
    }
}

impl From<VerifyError> for CommandError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::ActuatorBusy => CommandError::Busy,
            VerifyError::AlreadyPending => CommandError::VerifyPending,
        }
    }
}

/// Everything one tick produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickOutput {
    /// Sensor readings sampled this tick
    pub sensors: SensorSnapshot,
    /// Standalone verifier result
    pub verify: VerifyPoll,
    /// Endurance engine event
    pub test: TestEvent,
}

/// Solenoid controller context
pub struct SolenoidController<A, S> {
    actuator: A,
    sensors: S,
    verifier: SwitchVerifier,
    engine: TestEngine,
    config: MachineConfig,
}

impl<A, S> SolenoidController<A, S>
where
    A: BistableActuator,
    S: PositionSensors,
{
    /// Create a controller from already-initialized hardware
    pub fn new(actuator: A, sensors: S, config: MachineConfig) -> Self {
        Self {
            actuator,
            sensors,
            verifier: SwitchVerifier::new(),
            engine: TestEngine::new(config.verify.mapping),
            config,
        }
    }

    /// Run one control-loop iteration
    pub fn tick<G>(&mut self, now: Millis, guard: &G) -> TickOutput
    where
        G: MotionGuard + ?Sized,
    {
        self.actuator.poll_pulse_complete(now);
        let sensors = self.sensors.poll(now);
        let verify = self.verifier.poll(now, &mut self.actuator, &sensors);
        let test = self.engine.advance(now, &mut self.actuator, &sensors, guard);

        TickOutput {
            sensors,
            verify,
            test,
        }
    }

    /// Pulse towards `position` without verification
    ///
    /// Uses the configured pulse length when `pulse_ms` is `None`.
    pub fn switch_to(
        &mut self,
        position: Position,
        pulse_ms: Option<u16>,
        now: Millis,
    ) -> Result<(), CommandError> {
        let pulse_ms = pulse_ms.unwrap_or(self.config.solenoid.pulse_ms);
        validate_pulse(pulse_ms).map_err(CommandError::InvalidPulse)?;
        self.ensure_manual_allowed()?;

        self.actuator.switch_to(position, pulse_ms, now)?;
        Ok(())
    }

    /// Pulse towards `position` and confirm it with the mapped sensor
    ///
    /// The result arrives in [`TickOutput::verify`] on a later tick.
    pub fn verify_switch(&mut self, position: Position, now: Millis) -> Result<(), CommandError> {
        self.ensure_manual_allowed()?;

        let request = VerifyRequest {
            position,
            pulse_ms: self.config.solenoid.pulse_ms,
            sensor: self.config.verify.mapping.sensor_for(position),
            timeout_ms: self.config.verify.timeout_ms,
        };
        self.verifier.verify_switch(&mut self.actuator, request, now)?;
        Ok(())
    }

    /// Start an endurance session
    ///
    /// Uses the configured default policy when `policy` is `None`.
    pub fn start_test(
        &mut self,
        policy: Option<TestPolicy>,
        now: Millis,
    ) -> Result<TestEvent, StartError> {
        if self.engine.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        if self.verifier.is_pending() {
            return Err(StartError::VerifyPending);
        }
        self.engine
            .start_test(policy.unwrap_or(self.config.endurance), now)
    }

    /// Stop the endurance session, if one is running
    pub fn stop_test(&mut self, now: Millis) -> Option<TestReport> {
        self.engine.stop_test(now)
    }

    /// Status record as of the last tick
    pub fn status(&self, now: Millis) -> StatusReport {
        StatusReport::capture(
            &self.actuator,
            &self.sensors.last(),
            &self.engine,
            self.verifier.is_pending(),
            &self.config,
            now,
        )
    }

    fn ensure_manual_allowed(&self) -> Result<(), CommandError> {
        if self.engine.is_running() {
            return Err(CommandError::SessionRunning);
        }
        if self.verifier.is_pending() {
            return Err(CommandError::VerifyPending);
        }
        Ok(())
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn engine(&self) -> &TestEngine {
        &self.engine
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }
}
