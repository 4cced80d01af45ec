//! Configuration type definitions

use crate::traits::{Position, SensorId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default coil pulse length
pub const DEFAULT_PULSE_MS: u16 = 100;

/// Longest coil pulse accepted from config or a test policy
///
/// Latching coils are rated for short duty; anything longer than this is
/// almost certainly a unit mix-up and would cook the coil.
pub const MAX_PULSE_MS: u16 = 2000;

/// Default time to wait for the position sensor after settling
pub const DEFAULT_SENSOR_TIMEOUT_MS: u16 = 500;

/// Which positions an endurance test drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DirectionMode {
    /// Pulse towards A every cycle
    OnlyA,
    /// Pulse towards B every cycle
    OnlyB,
    /// A, B, A, ... one round trip per cycle
    #[default]
    Alternate,
}

impl DirectionMode {
    /// First position the test drives
    pub const fn initial_target(self) -> Position {
        match self {
            DirectionMode::OnlyB => Position::B,
            DirectionMode::OnlyA | DirectionMode::Alternate => Position::A,
        }
    }

    /// Short label for logs
    pub const fn label(self) -> &'static str {
        match self {
            DirectionMode::OnlyA => "A",
            DirectionMode::OnlyB => "B",
            DirectionMode::Alternate => "A<->B",
        }
    }
}

/// Endurance test policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TestPolicy {
    /// Positions to drive
    pub direction: DirectionMode,
    /// Coil pulse length (ms)
    pub pulse_ms: u16,
    /// Extra rest after each successful switch, for coil cooling (ms)
    pub cooldown_ms: u16,
    /// Sensor checked in the single-direction modes
    pub single_direction_sensor: SensorId,
    /// Pulses tried for one switch before it counts as failed
    pub max_attempts: u8,
    /// Failed switches in a row at one position before the test stops
    pub max_consecutive_failures: u8,
    /// Session time limit (ms), 0 = unbounded
    pub max_total_time_ms: u32,
    /// Cycle limit, 0 = unbounded
    pub max_cycles: u32,
}

impl Default for TestPolicy {
    fn default() -> Self {
        Self {
            direction: DirectionMode::Alternate,
            pulse_ms: DEFAULT_PULSE_MS,
            cooldown_ms: 0,
            single_direction_sensor: SensorId::Hall1,
            max_attempts: 3,
            max_consecutive_failures: 5,
            max_total_time_ms: 0,
            max_cycles: 0,
        }
    }
}

/// Reasons a test policy is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PolicyError {
    /// Pulse length of zero
    ZeroPulse,
    /// Pulse longer than [`MAX_PULSE_MS`]
    PulseTooLong,
    /// `max_attempts` of zero
    ZeroAttempts,
    /// `max_consecutive_failures` of zero
    ZeroFailureLimit,
}

impl TestPolicy {
    /// Check the policy limits
    pub fn validate(&self) -> Result<(), PolicyError> {
        validate_pulse(self.pulse_ms)?;
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if self.max_consecutive_failures == 0 {
            return Err(PolicyError::ZeroFailureLimit);
        }
        Ok(())
    }
}

/// Check a coil pulse length against the accepted range
pub fn validate_pulse(pulse_ms: u16) -> Result<(), PolicyError> {
    if pulse_ms == 0 {
        return Err(PolicyError::ZeroPulse);
    }
    if pulse_ms > MAX_PULSE_MS {
        return Err(PolicyError::PulseTooLong);
    }
    Ok(())
}

/// Which hall sensor confirms which position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorMapping {
    pub position_a: SensorId,
    pub position_b: SensorId,
}

impl Default for SensorMapping {
    fn default() -> Self {
        Self {
            position_a: SensorId::Hall1,
            position_b: SensorId::Hall2,
        }
    }
}

impl SensorMapping {
    /// Sensor that confirms `position`
    pub const fn sensor_for(&self, position: Position) -> SensorId {
        match position {
            Position::A => self.position_a,
            Position::B => self.position_b,
        }
    }
}

/// Solenoid and bridge electrical configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolenoidConfig {
    /// Default pulse length for manual switches (ms)
    pub pulse_ms: u16,
    /// Coil supply voltage (mV), for current estimates
    pub supply_mv: u32,
    /// Coil resistance (mΩ), for current estimates
    pub coil_resistance_mohm: u32,
    /// Bridge enable line is active-low
    pub enable_inverted: bool,
}

impl Default for SolenoidConfig {
    fn default() -> Self {
        Self {
            pulse_ms: DEFAULT_PULSE_MS,
            supply_mv: 24_000,
            coil_resistance_mohm: 30_000,
            enable_inverted: false,
        }
    }
}

/// Hall sensor input configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HallSensorConfig {
    /// Output pulls low when the field is present (AH3134 and most
    /// open-collector hall switches)
    pub active_low: bool,
}

impl Default for HallSensorConfig {
    fn default() -> Self {
        Self { active_low: true }
    }
}

/// Single-shot verification settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VerifyConfig {
    pub mapping: SensorMapping,
    /// Time allowed for the sensor after settling (ms)
    pub timeout_ms: u16,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            mapping: SensorMapping::default(),
            timeout_ms: DEFAULT_SENSOR_TIMEOUT_MS,
        }
    }
}

/// Default motion guard deadband
pub const DEFAULT_MOTION_DEADBAND: u32 = 10;

/// External motion guard settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionGuardConfig {
    /// Velocities with magnitude at or below this count as stopped
    pub deadband: u32,
}

impl Default for MotionGuardConfig {
    fn default() -> Self {
        Self {
            deadband: DEFAULT_MOTION_DEADBAND,
        }
    }
}

/// Complete machine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MachineConfig {
    pub solenoid: SolenoidConfig,
    /// Hall sensors 1 and 2
    pub hall: [HallSensorConfig; 2],
    pub verify: VerifyConfig,
    /// Policy used when a test is started without one
    pub endurance: TestPolicy,
    pub motion_guard: MotionGuardConfig,
}

/// Reasons a machine configuration is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Manual pulse length out of range
    Pulse(PolicyError),
    /// Default endurance policy invalid
    Policy(PolicyError),
    /// Coil resistance of zero
    ZeroCoilResistance,
    /// Sensor timeout of zero
    ZeroSensorTimeout,
    /// Both positions mapped to the same sensor
    SensorMappingConflict,
}

impl MachineConfig {
    /// Check all limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pulse(self.solenoid.pulse_ms).map_err(ConfigError::Pulse)?;
        if self.solenoid.coil_resistance_mohm == 0 {
            return Err(ConfigError::ZeroCoilResistance);
        }
        if self.verify.timeout_ms == 0 {
            return Err(ConfigError::ZeroSensorTimeout);
        }
        if self.verify.mapping.position_a == self.verify.mapping.position_b {
            return Err(ConfigError::SensorMappingConflict);
        }
        self.endurance.validate().map_err(ConfigError::Policy)?;
        Ok(())
    }

    /// Estimated coil current while a pulse is active (mA)
    pub fn coil_current_ma(&self) -> u16 {
        crate::traits::actuator::ohms_law_current_ma(
            self.solenoid.supply_mv,
            self.solenoid.coil_resistance_mohm,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(MachineConfig::default().validate(), Ok(()));
        assert_eq!(MachineConfig::default().coil_current_ma(), 800);
    }

    #[test]
    fn test_policy_rejects_zero_attempts() {
        let policy = TestPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(policy.validate(), Err(PolicyError::ZeroAttempts));
    }

    #[test]
    fn test_policy_rejects_zero_failure_limit() {
        let policy = TestPolicy {
            max_consecutive_failures: 0,
            ..Default::default()
        };
        assert_eq!(policy.validate(), Err(PolicyError::ZeroFailureLimit));
    }

    #[test]
    fn test_policy_pulse_limits() {
        let mut policy = TestPolicy::default();

        policy.pulse_ms = 0;
        assert_eq!(policy.validate(), Err(PolicyError::ZeroPulse));

        policy.pulse_ms = MAX_PULSE_MS;
        assert_eq!(policy.validate(), Ok(()));

        policy.pulse_ms = MAX_PULSE_MS + 1;
        assert_eq!(policy.validate(), Err(PolicyError::PulseTooLong));
    }

    #[test]
    fn test_mapping_conflict() {
        let mut config = MachineConfig::default();
        config.verify.mapping.position_b = SensorId::Hall1;
        assert_eq!(config.validate(), Err(ConfigError::SensorMappingConflict));
    }

    #[test]
    fn test_zero_coil_resistance() {
        let mut config = MachineConfig::default();
        config.solenoid.coil_resistance_mohm = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroCoilResistance));
    }

    #[test]
    fn test_initial_target() {
        assert_eq!(DirectionMode::OnlyA.initial_target(), Position::A);
        assert_eq!(DirectionMode::OnlyB.initial_target(), Position::B);
        assert_eq!(DirectionMode::Alternate.initial_target(), Position::A);
    }

    #[test]
    fn test_mapping_lookup() {
        let mapping = SensorMapping {
            position_a: SensorId::Hall2,
            position_b: SensorId::Hall1,
        };
        assert_eq!(mapping.sensor_for(Position::A), SensorId::Hall2);
        assert_eq!(mapping.sensor_for(Position::B), SensorId::Hall1);
    }
}
