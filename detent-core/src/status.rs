//! Flat status record for the request layer
//!
//! Field names are stable and every number is fixed-width so the record can
//! go over the wire as-is. Missing statistics read as 0.

use crate::config::MachineConfig;
use crate::endurance::{StopReason, TestEngine, TestPhase};
use crate::time::Millis;
use crate::traits::{BistableActuator, Position, SensorSnapshot};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of actuator, sensors and endurance session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusReport {
    // Actuator
    pub position: Option<Position>,
    pub pulse_active: bool,
    pub drive_enabled: bool,
    pub coil_current_ma: u16,
    pub verify_pending: bool,

    // Sensors
    pub sensor1_active: bool,
    pub sensor1_last_change_ms: u32,
    pub sensor2_active: bool,
    pub sensor2_last_change_ms: u32,

    // Session
    pub session_running: bool,
    pub session_phase: TestPhase,
    pub current_target: Position,
    pub attempt: u8,
    pub cycle_count: u32,
    pub elapsed_ms: u32,
    pub consecutive_failures_a: u8,
    pub consecutive_failures_b: u8,
    pub last_stop: Option<StopReason>,

    // Statistics
    pub total_switches: u32,
    pub successful_switches: u32,
    pub failed_switches: u32,
    pub success_rate_permille: u16,
    pub avg_response_ms_x10: u32,
    pub min_response_ms: u16,
    pub max_response_ms: u16,
    pub switches_a: u32,
    pub avg_response_a_ms_x10: u32,
    pub switches_b: u32,
    pub avg_response_b_ms_x10: u32,
}

impl StatusReport {
    /// Collect the current state
    pub fn capture<A>(
        actuator: &A,
        sensors: &SensorSnapshot,
        engine: &TestEngine,
        verify_pending: bool,
        config: &MachineConfig,
        now: Millis,
    ) -> Self
    where
        A: BistableActuator + ?Sized,
    {
        let stats = engine.stats();
        let a = stats.position(Position::A);
        let b = stats.position(Position::B);

        Self {
            position: actuator.position(),
            pulse_active: actuator.is_pulse_active(),
            drive_enabled: actuator.is_enabled(),
            coil_current_ma: actuator.estimate_current_ma(
                config.solenoid.supply_mv,
                config.solenoid.coil_resistance_mohm,
            ),
            verify_pending,

            sensor1_active: sensors.sensor1.active,
            sensor1_last_change_ms: sensors.sensor1.last_change_at,
            sensor2_active: sensors.sensor2.active,
            sensor2_last_change_ms: sensors.sensor2.last_change_at,

            session_running: engine.is_running(),
            session_phase: engine.phase(),
            current_target: engine.current_target(),
            attempt: engine.attempt(),
            cycle_count: engine.cycle_count(),
            elapsed_ms: engine.elapsed_ms(now),
            consecutive_failures_a: engine.consecutive_failures(Position::A),
            consecutive_failures_b: engine.consecutive_failures(Position::B),
            last_stop: engine.last_stop(),

            total_switches: stats.total_switches,
            successful_switches: stats.successful_switches,
            failed_switches: stats.failed_switches,
            success_rate_permille: stats.success_rate_permille().unwrap_or(0),
            avg_response_ms_x10: stats.overall.average_ms_x10().unwrap_or(0),
            min_response_ms: stats.overall.min().unwrap_or(0),
            max_response_ms: stats.overall.max().unwrap_or(0),
            switches_a: a.count,
            avg_response_a_ms_x10: a.average_ms_x10().unwrap_or(0),
            switches_b: b.count,
            avg_response_b_ms_x10: b.average_ms_x10().unwrap_or(0),
        }
    }

    /// Serialize into `buf` with postcard
    #[cfg(feature = "serde")]
    pub fn encode<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], postcard::Error> {
        postcard::to_slice(self, buf)
    }

    /// Deserialize a record produced by [`encode`](Self::encode)
    #[cfg(feature = "serde")]
    pub fn decode(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestPolicy;
    use crate::testing::Rig;
    use crate::traits::{PositionSensors, Stationary};

    #[test]
    fn test_idle_status() {
        let rig = Rig::new(30);
        let engine = TestEngine::default();
        let status = StatusReport::capture(
            &rig.actuator,
            &rig.sensors.last(),
            &engine,
            false,
            &MachineConfig::default(),
            0,
        );

        assert_eq!(status.position, None);
        assert!(!status.pulse_active);
        assert_eq!(status.coil_current_ma, 0);
        assert!(!status.session_running);
        assert_eq!(status.success_rate_permille, 0);
        assert_eq!(status.last_stop, None);
    }

    #[test]
    fn test_status_during_pulse_reports_current() {
        let mut rig = Rig::new(30);
        let mut engine = TestEngine::default();
        engine.start_test(TestPolicy::default(), 0).unwrap();

        let snapshot = rig.tick(0);
        engine.advance(0, &mut rig.actuator, &snapshot, &Stationary);

        let status = StatusReport::capture(
            &rig.actuator,
            &snapshot,
            &engine,
            false,
            &MachineConfig::default(),
            20,
        );
        assert!(status.pulse_active);
        assert!(status.drive_enabled);
        assert_eq!(status.coil_current_ma, 800);
        assert!(status.session_running);
        assert_eq!(status.session_phase, TestPhase::Switching);
        assert_eq!(status.total_switches, 1);
        assert_eq!(status.elapsed_ms, 20);
    }

    #[test]
    fn test_status_after_session() {
        let mut rig = Rig::new(30);
        let mut engine = TestEngine::default();
        let policy = TestPolicy {
            max_cycles: 1,
            ..Default::default()
        };
        engine.start_test(policy, 0).unwrap();

        for now in 0..=1000 {
            let snapshot = rig.tick(now);
            engine.advance(now, &mut rig.actuator, &snapshot, &Stationary);
        }

        let status = StatusReport::capture(
            &rig.actuator,
            &rig.sensors.last(),
            &engine,
            false,
            &MachineConfig::default(),
            1000,
        );
        assert!(!status.session_running);
        assert_eq!(status.last_stop, Some(StopReason::CycleLimit));
        assert_eq!(status.cycle_count, 1);
        assert_eq!(status.successful_switches, 2);
        assert_eq!(status.switches_a, 1);
        assert_eq!(status.switches_b, 1);
        assert_eq!(status.success_rate_permille, 1000);
        assert_eq!(status.position, Some(Position::B));
        // Armature ended at B, sensor 2 saw the last edge
        assert!(status.sensor2_active);
        assert!(!status.sensor1_active);
        assert_eq!(status.elapsed_ms, 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_encode_decode() {
        let status = StatusReport {
            position: Some(Position::A),
            cycle_count: 42,
            last_stop: Some(StopReason::Jam {
                position: Position::B,
                consecutive_failures: 5,
            }),
            ..Default::default()
        };
        let mut buf = [0u8; 128];
        let bytes = status.encode(&mut buf).unwrap();
        assert_eq!(StatusReport::decode(bytes).unwrap(), status);
    }
}
