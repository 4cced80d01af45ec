//! Endurance test engine
//!
//! Repeats switch/verify cycles under a [`TestPolicy`]. Each call to
//! [`TestEngine::advance`] runs the top-level checks in order and stops at
//! the first that applies:
//!
//! 1. time limit reached: stop
//! 2. cycle limit reached: stop
//! 3. external drive moving: yield the tick
//! 4. otherwise step the session: issue a pulse when due, or poll the
//!    outstanding verification
//!
//! A timed-out attempt is retried at the same position after
//! [`RETRY_DELAY_MS`]. When all attempts for a switch are used up the switch
//! counts as failed; Alternate mode then tries the other side. A position
//! that fails `max_consecutive_failures` switches in a row stops the session
//! as jammed.

use super::events::{StartError, StopReason, TestEvent, TestPhase, TestReport};
use super::stats::TestStatistics;
use crate::config::{DirectionMode, SensorMapping, TestPolicy, DEFAULT_SENSOR_TIMEOUT_MS};
use crate::time::{after, elapsed, reached, Millis};
use crate::traits::{BistableActuator, MotionGuard, Position, SensorId, SensorSnapshot};
use crate::verify::{SwitchVerifier, VerifyOutcome, VerifyPhase, VerifyPoll, VerifyRequest};

/// Sensor timeout for every endurance attempt
pub const SENSOR_TIMEOUT_MS: u16 = DEFAULT_SENSOR_TIMEOUT_MS;

/// Pause before retrying after a timed-out attempt
pub const RETRY_DELAY_MS: u32 = 200;

/// Endurance test engine
///
/// Owns its own [`SwitchVerifier`]; at most one session exists at a time.
#[derive(Debug, Clone)]
pub struct TestEngine {
    verifier: SwitchVerifier,
    mapping: SensorMapping,
    running: bool,
    policy: TestPolicy,
    phase: TestPhase,
    current_target: Position,
    initial_target: Position,
    /// Timed-out attempts for the current switch
    attempt: u8,
    consecutive_failures: [u8; 2],
    cycle_count: u32,
    started_at: Millis,
    next_action_at: Millis,
    stats: TestStatistics,
    last_stop: Option<StopReason>,
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new(SensorMapping::default())
    }
}

impl TestEngine {
    /// Create an idle engine
    ///
    /// `mapping` selects the sensor per position in Alternate mode.
    pub fn new(mapping: SensorMapping) -> Self {
        Self {
            verifier: SwitchVerifier::new(),
            mapping,
            running: false,
            policy: TestPolicy::default(),
            phase: TestPhase::Idle,
            current_target: Position::A,
            initial_target: Position::A,
            attempt: 0,
            consecutive_failures: [0; 2],
            cycle_count: 0,
            started_at: 0,
            next_action_at: 0,
            stats: TestStatistics::default(),
            last_stop: None,
        }
    }

    /// Start a session
    ///
    /// The first pulse is issued on the next [`advance`](Self::advance).
    /// Returns [`TestEvent::Started`] carrying the accepted policy for the log.
    pub fn start_test(&mut self, policy: TestPolicy, now: Millis) -> Result<TestEvent, StartError> {
        if self.running {
            return Err(StartError::AlreadyRunning);
        }
        policy.validate()?;

        let target = policy.direction.initial_target();
        self.verifier = SwitchVerifier::new();
        self.running = true;
        self.policy = policy;
        self.phase = TestPhase::Idle;
        self.current_target = target;
        self.initial_target = target;
        self.attempt = 0;
        self.consecutive_failures = [0; 2];
        self.cycle_count = 0;
        self.started_at = now;
        self.next_action_at = now;
        self.stats.reset();
        self.last_stop = None;

        Ok(TestEvent::Started(policy))
    }

    /// Stop the session on request
    ///
    /// Returns the final report, or `None` if no session was running. An
    /// in-flight coil pulse is left to the actuator's own poll.
    pub fn stop_test(&mut self, now: Millis) -> Option<TestReport> {
        if !self.running {
            return None;
        }
        Some(self.finish(StopReason::Requested, now))
    }

    /// Run one engine tick
    pub fn advance<A, G>(
        &mut self,
        now: Millis,
        actuator: &mut A,
        sensors: &SensorSnapshot,
        guard: &G,
    ) -> TestEvent
    where
        A: BistableActuator + ?Sized,
        G: MotionGuard + ?Sized,
    {
        if !self.running {
            return TestEvent::Idle;
        }

        if self.policy.max_total_time_ms != 0
            && elapsed(now, self.started_at) >= self.policy.max_total_time_ms
        {
            return TestEvent::SessionStopped(self.finish(StopReason::TimeLimit, now));
        }

        if self.policy.max_cycles != 0 && self.cycle_count >= self.policy.max_cycles {
            return TestEvent::SessionStopped(self.finish(StopReason::CycleLimit, now));
        }

        if guard.is_moving() {
            return TestEvent::Yielded;
        }

        match self.phase {
            TestPhase::Idle => {
                if reached(now, self.next_action_at) {
                    self.issue(now, actuator)
                } else {
                    TestEvent::Idle
                }
            }
            TestPhase::Switching | TestPhase::Checking => {
                match self.verifier.poll(now, actuator, sensors) {
                    VerifyPoll::Pending(phase) => {
                        let phase = session_phase(phase);
                        if phase == self.phase {
                            TestEvent::Idle
                        } else {
                            self.phase = phase;
                            TestEvent::PhaseChanged(phase)
                        }
                    }
                    VerifyPoll::Resolved(VerifyOutcome::Confirmed { response_ms }) => {
                        self.on_success(now, response_ms)
                    }
                    VerifyPoll::Resolved(VerifyOutcome::TimedOut) => self.on_timeout(now),
                    // Verifier lost its attempt; schedule the pulse again
                    VerifyPoll::Idle => {
                        self.phase = TestPhase::Idle;
                        TestEvent::PhaseChanged(TestPhase::Idle)
                    }
                }
            }
        }
    }

    fn issue<A>(&mut self, now: Millis, actuator: &mut A) -> TestEvent
    where
        A: BistableActuator + ?Sized,
    {
        let position = self.current_target;
        let request = VerifyRequest {
            position,
            pulse_ms: self.policy.pulse_ms,
            sensor: self.sensor_for(position),
            timeout_ms: SENSOR_TIMEOUT_MS,
        };

        // Busy means a manual pulse is still on the coil; try again next tick
        if self.verifier.verify_switch(actuator, request, now).is_err() {
            return TestEvent::Idle;
        }

        self.stats.record_pulse();
        self.phase = TestPhase::Switching;
        TestEvent::SwitchIssued {
            position,
            attempt: self.attempt + 1,
            max_attempts: self.policy.max_attempts,
        }
    }

    fn on_success(&mut self, now: Millis, response_ms: u16) -> TestEvent {
        let position = self.current_target;

        self.stats.record_success(position, response_ms);
        self.consecutive_failures[position.index()] = 0;
        self.attempt = 0;
        self.phase = TestPhase::Idle;

        match self.policy.direction {
            DirectionMode::Alternate => {
                self.current_target = position.opposite();
                if self.current_target == self.initial_target {
                    self.cycle_count = self.cycle_count.saturating_add(1);
                }
            }
            DirectionMode::OnlyA | DirectionMode::OnlyB => {
                self.cycle_count = self.cycle_count.saturating_add(1);
            }
        }

        let rest = self.policy.pulse_ms as u32 + self.policy.cooldown_ms as u32;
        self.next_action_at = after(now, rest);

        TestEvent::SwitchSucceeded {
            position,
            response_ms,
            cycle_count: self.cycle_count,
        }
    }

    fn on_timeout(&mut self, now: Millis) -> TestEvent {
        let position = self.current_target;
        let max_attempts = self.policy.max_attempts;

        self.attempt = self.attempt.saturating_add(1);
        self.phase = TestPhase::Idle;
        self.next_action_at = after(now, RETRY_DELAY_MS);

        if self.attempt < max_attempts {
            return TestEvent::AttemptFailed {
                position,
                attempt: self.attempt,
                max_attempts,
            };
        }

        self.stats.record_failure();
        self.attempt = 0;
        let failures = &mut self.consecutive_failures[position.index()];
        *failures = failures.saturating_add(1);
        let consecutive_failures = *failures;

        let limit = self.policy.max_consecutive_failures;
        if consecutive_failures >= limit {
            let reason = StopReason::Jam {
                position,
                consecutive_failures,
            };
            return TestEvent::SessionStopped(self.finish(reason, now));
        }

        if self.policy.direction == DirectionMode::Alternate {
            self.current_target = position.opposite();
        }

        TestEvent::SwitchFailed {
            position,
            consecutive_failures,
            limit,
            next_target: self.current_target,
        }
    }

    fn finish(&mut self, reason: StopReason, now: Millis) -> TestReport {
        self.running = false;
        self.phase = TestPhase::Idle;
        self.verifier = SwitchVerifier::new();
        self.last_stop = Some(reason);

        TestReport {
            reason,
            duration_ms: elapsed(now, self.started_at),
            cycle_count: self.cycle_count,
            stats: self.stats,
        }
    }

    fn sensor_for(&self, position: Position) -> SensorId {
        match self.policy.direction {
            DirectionMode::Alternate => self.mapping.sensor_for(position),
            DirectionMode::OnlyA | DirectionMode::OnlyB => self.policy.single_direction_sensor,
        }
    }

    /// Check if a session is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current session phase
    pub fn phase(&self) -> TestPhase {
        self.phase
    }

    /// Policy of the current or last session
    pub fn policy(&self) -> &TestPolicy {
        &self.policy
    }

    /// Position the session drives next
    pub fn current_target(&self) -> Position {
        self.current_target
    }

    /// Timed-out attempts for the current switch
    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    /// Failed switches in a row at `position`
    pub fn consecutive_failures(&self, position: Position) -> u8 {
        self.consecutive_failures[position.index()]
    }

    /// Statistics of the current or last session
    pub fn stats(&self) -> &TestStatistics {
        &self.stats
    }

    /// Why the last session ended
    pub fn last_stop(&self) -> Option<StopReason> {
        self.last_stop
    }

    /// Session run time, 0 when idle
    pub fn elapsed_ms(&self, now: Millis) -> u32 {
        if self.running {
            elapsed(now, self.started_at)
        } else {
            0
        }
    }

    /// Replace the position-to-sensor mapping
    pub fn set_mapping(&mut self, mapping: SensorMapping) {
        self.mapping = mapping;
    }
}

fn session_phase(phase: VerifyPhase) -> TestPhase {
    match phase {
        VerifyPhase::WaitingForPulse | VerifyPhase::Stabilizing => TestPhase::Switching,
        VerifyPhase::CheckingSensor => TestPhase::Checking,
    }
}
