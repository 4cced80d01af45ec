//! Events and reports produced by the endurance engine

use core::fmt::Write;

use heapless::String;

use super::stats::TestStatistics;
use crate::config::{PolicyError, TestPolicy};
use crate::traits::Position;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Phase of the running session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TestPhase {
    /// Waiting for the next scheduled pulse
    #[default]
    Idle,
    /// Coil pulse in progress or settling
    Switching,
    /// Waiting for the target sensor
    Checking,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    /// `stop_test` was called
    Requested,
    /// `max_total_time_ms` elapsed
    TimeLimit,
    /// `max_cycles` reached
    CycleLimit,
    /// One position failed too many switches in a row
    Jam {
        position: Position,
        consecutive_failures: u8,
    },
}

impl StopReason {
    /// Human-readable reason
    pub const fn description(&self) -> &'static str {
        match self {
            StopReason::Requested => "stopped by request",
            StopReason::TimeLimit => "time limit reached",
            StopReason::CycleLimit => "cycle limit reached",
            StopReason::Jam {
                position: Position::A,
                ..
            } => "jam detected at position A",
            StopReason::Jam {
                position: Position::B,
                ..
            } => "jam detected at position B",
        }
    }

    /// Reason with the failure count, for the request layer
    pub fn message(&self) -> String<64> {
        let mut msg = String::new();
        // Longest message is 52 bytes
        let _ = match self {
            StopReason::Jam {
                consecutive_failures,
                ..
            } => write!(
                msg,
                "{} after {} failed switches",
                self.description(),
                consecutive_failures
            ),
            _ => msg.push_str(self.description()).map_err(|_| core::fmt::Error),
        };
        msg
    }

    /// Check if the session ended on a mechanical fault
    pub const fn is_fault(&self) -> bool {
        matches!(self, StopReason::Jam { .. })
    }
}

/// Final statistics of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TestReport {
    pub reason: StopReason,
    /// Session run time (ms)
    pub duration_ms: u32,
    pub cycle_count: u32,
    pub stats: TestStatistics,
}

impl TestReport {
    /// Average response time over all positions, 0.1 ms units
    pub fn average_ms_x10(&self) -> Option<u32> {
        self.stats.overall.average_ms_x10()
    }

    /// Success rate in permille
    pub fn success_rate_permille(&self) -> Option<u16> {
        self.stats.success_rate_permille()
    }
}

/// What one call to [`TestEngine::advance`](super::TestEngine::advance) did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestEvent {
    /// No session, or nothing due this tick
    Idle,
    /// A session was started with this policy
    Started(TestPolicy),
    /// The external drive is moving; tick skipped
    Yielded,
    /// A pulse was issued
    SwitchIssued {
        position: Position,
        /// 1-based attempt number
        attempt: u8,
        max_attempts: u8,
    },
    /// The session phase moved on without resolving
    PhaseChanged(TestPhase),
    /// The target sensor confirmed the switch
    SwitchSucceeded {
        position: Position,
        response_ms: u16,
        cycle_count: u32,
    },
    /// One attempt timed out; the same position is retried
    AttemptFailed {
        position: Position,
        /// 1-based number of the attempt that failed
        attempt: u8,
        max_attempts: u8,
    },
    /// All attempts for a switch timed out
    SwitchFailed {
        position: Position,
        consecutive_failures: u8,
        limit: u8,
        next_target: Position,
    },
    /// The session ended
    SessionStopped(TestReport),
}

/// Reasons a session could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError {
    /// A session is already running
    AlreadyRunning,
    /// A manual verification still owns the actuator
    VerifyPending,
    /// The policy failed validation
    InvalidPolicy(PolicyError),
}

impl From<PolicyError> for StartError {
    fn from(e: PolicyError) -> Self {
        StartError::InvalidPolicy(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jam_description_names_position() {
        let jam = StopReason::Jam {
            position: Position::B,
            consecutive_failures: 5,
        };
        assert_eq!(jam.description(), "jam detected at position B");
        assert!(jam.is_fault());
        assert!(!StopReason::CycleLimit.is_fault());
    }

    #[test]
    fn test_message() {
        let jam = StopReason::Jam {
            position: Position::A,
            consecutive_failures: 3,
        };
        assert_eq!(jam.message().as_str(), "jam detected at position A after 3 failed switches");
        assert_eq!(StopReason::TimeLimit.message().as_str(), "time limit reached");
    }
}
