//! Switch-and-confirm state machine
//!
//! ```text
//!  Idle ──verify_switch──► WaitingForPulse ──pulse off, ≥ pulse_ms──► Stabilizing
//!                                                                       │ 50 ms
//!                                                                       ▼
//!  Idle ◄──Resolved(Confirmed | TimedOut)──────────────────────── CheckingSensor
//! ```
//!
//! Solenoid settling and hall sensor latency both vary from unit to unit.
//! The stabilization window keeps armature bounce from being read as an
//! answer, and the response time is measured only from the end of that
//! window so it reflects the sensor, not the pulse.

use crate::time::{elapsed, Millis};
use crate::traits::{BistableActuator, Position, SensorId, SensorSnapshot};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dead time after the coil is released before the sensor is trusted
pub const STABILIZATION_MS: u32 = 50;

/// Parameters of one verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VerifyRequest {
    /// Position to pulse towards
    pub position: Position,
    /// Coil pulse length (ms)
    pub pulse_ms: u16,
    /// Sensor that must see the armature
    pub sensor: SensorId,
    /// Time allowed for the sensor after stabilization (ms)
    pub timeout_ms: u16,
}

/// Phase of an outstanding verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VerifyPhase {
    /// Coil is energized
    WaitingForPulse,
    /// Coil released, waiting out armature bounce
    Stabilizing,
    /// Watching the target sensor
    CheckingSensor,
}

/// How a verification ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VerifyOutcome {
    /// Target sensor went active `response_ms` after stabilization
    Confirmed { response_ms: u16 },
    /// Target sensor stayed inactive for the whole timeout
    TimedOut,
}

impl VerifyOutcome {
    /// Check if the switch was confirmed
    pub fn is_confirmed(&self) -> bool {
        matches!(self, VerifyOutcome::Confirmed { .. })
    }
}

/// Result of polling the verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerifyPoll {
    /// Nothing outstanding
    Idle,
    /// Still working, currently in this phase
    Pending(VerifyPhase),
    /// Finished; reported once, the verifier is idle afterwards
    Resolved(VerifyOutcome),
}

/// Reasons a verification could not start
///
/// Both are "busy" signals: nothing was changed and the caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerifyError {
    /// The actuator is mid-pulse
    ActuatorBusy,
    /// Another verification has not resolved yet
    AlreadyPending,
}

/// In-flight verification, carrying everything needed to resume it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VerificationAttempt {
    pub request: VerifyRequest,
    pub phase: VerifyPhase,
    /// When the pulse was issued
    pub issued_at: Millis,
    /// When the current phase began
    pub phase_started_at: Millis,
}

impl VerificationAttempt {
    fn enter(&mut self, phase: VerifyPhase, now: Millis) {
        self.phase = phase;
        self.phase_started_at = now;
    }

    /// Run as many transitions as `now` allows
    fn advance<A>(&mut self, now: Millis, actuator: &mut A, sensors: &SensorSnapshot) -> Option<VerifyOutcome>
    where
        A: BistableActuator + ?Sized,
    {
        if self.phase == VerifyPhase::WaitingForPulse {
            let pulse_active = actuator.poll_pulse_complete(now);
            // A pulse that reads as off before its time is stale state, not completion
            if !pulse_active && elapsed(now, self.issued_at) >= self.request.pulse_ms as u32 {
                self.enter(VerifyPhase::Stabilizing, now);
            }
        }

        if self.phase == VerifyPhase::Stabilizing
            && elapsed(now, self.phase_started_at) >= STABILIZATION_MS
        {
            self.enter(VerifyPhase::CheckingSensor, now);
        }

        if self.phase == VerifyPhase::CheckingSensor {
            let waited = elapsed(now, self.phase_started_at);
            let timeout = self.request.timeout_ms as u32;

            // A late poll cannot tell when the sensor went active
            if waited > timeout {
                return Some(VerifyOutcome::TimedOut);
            }
            if sensors.is_active(self.request.sensor) {
                return Some(VerifyOutcome::Confirmed {
                    response_ms: waited as u16,
                });
            }
            if waited == timeout {
                return Some(VerifyOutcome::TimedOut);
            }
        }

        None
    }
}

/// Single-shot switch verifier
///
/// Holds at most one outstanding [`VerificationAttempt`]. An attempt that is
/// never polled again stays outstanding; there is no implicit expiry.
#[derive(Debug, Clone, Default)]
pub struct SwitchVerifier {
    attempt: Option<VerificationAttempt>,
}

impl SwitchVerifier {
    /// Create an idle verifier
    pub const fn new() -> Self {
        Self { attempt: None }
    }

    /// Pulse the actuator and start verifying
    pub fn verify_switch<A>(
        &mut self,
        actuator: &mut A,
        request: VerifyRequest,
        now: Millis,
    ) -> Result<(), VerifyError>
    where
        A: BistableActuator + ?Sized,
    {
        if self.attempt.is_some() {
            return Err(VerifyError::AlreadyPending);
        }
        if actuator.is_pulse_active() {
            return Err(VerifyError::ActuatorBusy);
        }

        actuator
            .switch_to(request.position, request.pulse_ms, now)
            .map_err(|_| VerifyError::ActuatorBusy)?;

        self.attempt = Some(VerificationAttempt {
            request,
            phase: VerifyPhase::WaitingForPulse,
            issued_at: now,
            phase_started_at: now,
        });
        Ok(())
    }

    /// Advance the outstanding verification
    pub fn poll<A>(&mut self, now: Millis, actuator: &mut A, sensors: &SensorSnapshot) -> VerifyPoll
    where
        A: BistableActuator + ?Sized,
    {
        let Some(attempt) = self.attempt.as_mut() else {
            return VerifyPoll::Idle;
        };

        let outcome = attempt.advance(now, actuator, sensors);
        let phase = attempt.phase;

        match outcome {
            Some(outcome) => {
                self.attempt = None;
                VerifyPoll::Resolved(outcome)
            }
            None => VerifyPoll::Pending(phase),
        }
    }

    /// Check if a verification is outstanding
    pub fn is_pending(&self) -> bool {
        self.attempt.is_some()
    }

    /// The outstanding verification, if any
    pub fn attempt(&self) -> Option<&VerificationAttempt> {
        self.attempt.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeActuator, FakeSensors, Rig};
    use crate::traits::PositionSensors;

    const PULSE: u16 = 100;
    const TIMEOUT: u16 = 500;
    /// Sensor check begins after the pulse plus the stabilization window
    const CHECK_START: u32 = PULSE as u32 + STABILIZATION_MS;

    fn request(position: Position, sensor: SensorId) -> VerifyRequest {
        VerifyRequest {
            position,
            pulse_ms: PULSE,
            sensor,
            timeout_ms: TIMEOUT,
        }
    }

    /// Poll every millisecond from `from` to `to` inclusive, stopping at resolution
    fn poll_until(
        verifier: &mut SwitchVerifier,
        actuator: &mut FakeActuator,
        sensors: &mut FakeSensors,
        from: u32,
        to: u32,
    ) -> (u32, VerifyPoll) {
        let mut last = VerifyPoll::Idle;
        for now in from..=to {
            actuator.poll_pulse_complete(now);
            let snapshot = sensors.poll(now);
            last = verifier.poll(now, actuator, &snapshot);
            if let VerifyPoll::Resolved(_) = last {
                return (now, last);
            }
        }
        (to, last)
    }

    #[test]
    fn test_idle_poll() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let snapshot = SensorSnapshot::default();

        assert_eq!(verifier.poll(0, &mut actuator, &snapshot), VerifyPoll::Idle);
        assert!(!verifier.is_pending());
    }

    #[test]
    fn test_confirmed_switch() {
        let mut rig = Rig::new(20);
        let mut verifier = SwitchVerifier::new();

        verifier
            .verify_switch(&mut rig.actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();
        assert!(verifier.is_pending());

        let mut resolved = None;
        for now in 0..=1000 {
            let snapshot = rig.tick(now);
            if let VerifyPoll::Resolved(outcome) = verifier.poll(now, &mut rig.actuator, &snapshot) {
                resolved = Some((now, outcome));
                break;
            }
        }

        // Armature arrived during stabilization, so the sensor is already active
        assert_eq!(
            resolved,
            Some((CHECK_START, VerifyOutcome::Confirmed { response_ms: 0 }))
        );
        assert!(!verifier.is_pending());
        assert_eq!(rig.actuator.position(), Some(Position::A));
    }

    #[test]
    fn test_response_time_measured_from_check_start() {
        let mut rig = Rig::new(80);
        let mut verifier = SwitchVerifier::new();

        verifier
            .verify_switch(&mut rig.actuator, request(Position::B, SensorId::Hall2), 0)
            .unwrap();

        let mut resolved = None;
        for now in 0..=1000 {
            let snapshot = rig.tick(now);
            if let VerifyPoll::Resolved(outcome) = verifier.poll(now, &mut rig.actuator, &snapshot) {
                resolved = Some(outcome);
                break;
            }
        }

        // Arrival at 100 + 80, check started at 150
        assert_eq!(resolved, Some(VerifyOutcome::Confirmed { response_ms: 30 }));
    }

    #[test]
    fn test_phases_in_order() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let snapshot = SensorSnapshot::default();

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        assert_eq!(
            verifier.poll(50, &mut actuator, &snapshot),
            VerifyPoll::Pending(VerifyPhase::WaitingForPulse)
        );
        assert_eq!(
            verifier.poll(100, &mut actuator, &snapshot),
            VerifyPoll::Pending(VerifyPhase::Stabilizing)
        );
        assert_eq!(
            verifier.poll(149, &mut actuator, &snapshot),
            VerifyPoll::Pending(VerifyPhase::Stabilizing)
        );
        assert_eq!(
            verifier.poll(150, &mut actuator, &snapshot),
            VerifyPoll::Pending(VerifyPhase::CheckingSensor)
        );
        assert_eq!(verifier.attempt().unwrap().phase_started_at, 150);
    }

    #[test]
    fn test_pending_one_ms_before_timeout() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let mut sensors = FakeSensors::default();

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        let deadline = CHECK_START + TIMEOUT as u32;
        let (_, last) = poll_until(&mut verifier, &mut actuator, &mut sensors, 0, deadline - 1);
        assert_eq!(last, VerifyPoll::Pending(VerifyPhase::CheckingSensor));
    }

    #[test]
    fn test_times_out_exactly_at_timeout() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let mut sensors = FakeSensors::default();

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        let deadline = CHECK_START + TIMEOUT as u32;
        let (at, last) = poll_until(&mut verifier, &mut actuator, &mut sensors, 0, deadline + 10);
        assert_eq!(at, deadline);
        assert_eq!(last, VerifyPoll::Resolved(VerifyOutcome::TimedOut));
    }

    #[test]
    fn test_sensor_at_exact_timeout_is_confirmed() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let mut sensors = FakeSensors::default();

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        let deadline = CHECK_START + TIMEOUT as u32;
        poll_until(&mut verifier, &mut actuator, &mut sensors, 0, deadline - 1);

        sensors.set(SensorId::Hall1, true);
        let snapshot = sensors.poll(deadline);
        assert_eq!(
            verifier.poll(deadline, &mut actuator, &snapshot),
            VerifyPoll::Resolved(VerifyOutcome::Confirmed {
                response_ms: TIMEOUT
            })
        );
    }

    #[test]
    fn test_late_poll_after_timeout_fails_even_if_active() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let mut sensors = FakeSensors::default();

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        let deadline = CHECK_START + TIMEOUT as u32;
        poll_until(&mut verifier, &mut actuator, &mut sensors, 0, deadline - 1);

        // Next poll arrives one tick late
        sensors.set(SensorId::Hall1, true);
        let snapshot = sensors.poll(deadline + 1);
        assert_eq!(
            verifier.poll(deadline + 1, &mut actuator, &snapshot),
            VerifyPoll::Resolved(VerifyOutcome::TimedOut)
        );
    }

    #[test]
    fn test_wrong_sensor_does_not_confirm() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let mut sensors = FakeSensors::default();
        sensors.set(SensorId::Hall2, true);

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        let (_, last) = poll_until(&mut verifier, &mut actuator, &mut sensors, 0, 2000);
        assert_eq!(last, VerifyPoll::Resolved(VerifyOutcome::TimedOut));
    }

    #[test]
    fn test_resolved_reported_once() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let mut sensors = FakeSensors::default();
        sensors.set(SensorId::Hall1, true);

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        let (at, last) = poll_until(&mut verifier, &mut actuator, &mut sensors, 0, 1000);
        assert!(matches!(last, VerifyPoll::Resolved(VerifyOutcome::Confirmed { .. })));

        let snapshot = sensors.poll(at + 1);
        assert_eq!(verifier.poll(at + 1, &mut actuator, &snapshot), VerifyPoll::Idle);
    }

    #[test]
    fn test_rejects_while_pending() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        let snapshot = SensorSnapshot::default();

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        // Pulse is over but the verification is still outstanding
        verifier.poll(120, &mut actuator, &snapshot);
        assert!(!actuator.is_pulse_active());

        let result = verifier.verify_switch(&mut actuator, request(Position::B, SensorId::Hall2), 120);
        assert_eq!(result, Err(VerifyError::AlreadyPending));
        assert_eq!(actuator.pulses_issued, 1);
        assert_eq!(verifier.attempt().unwrap().request.position, Position::A);
    }

    #[test]
    fn test_rejects_while_actuator_busy() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();
        actuator.switch_to(Position::B, 100, 0).unwrap();

        let result = verifier.verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 10);
        assert_eq!(result, Err(VerifyError::ActuatorBusy));
        assert!(!verifier.is_pending());
        assert_eq!(actuator.pulses_issued, 1);
    }

    #[test]
    fn test_unpolled_attempt_stays_outstanding() {
        let mut verifier = SwitchVerifier::new();
        let mut actuator = FakeActuator::default();

        verifier
            .verify_switch(&mut actuator, request(Position::A, SensorId::Hall1), 0)
            .unwrap();

        // Nobody polls for a long time; the attempt is still there
        actuator.poll_pulse_complete(10_000);
        assert!(verifier.is_pending());
        assert_eq!(
            verifier.attempt().unwrap().phase,
            VerifyPhase::WaitingForPulse
        );
    }
}
