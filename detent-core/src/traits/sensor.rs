//! Position sensor traits
//!
//! Two binary magnetic (hall-effect) sensors report whether the armature's
//! magnet sits in front of them. The sensor output is assumed electrically
//! clean; software only timestamps edges, it does not filter.

use crate::time::Millis;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which of the two hall sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorId {
    /// Hall sensor 1
    #[default]
    Hall1,
    /// Hall sensor 2
    Hall2,
}

impl SensorId {
    /// Sensor from its 1-based number as written in config
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(SensorId::Hall1),
            2 => Some(SensorId::Hall2),
            _ => None,
        }
    }

    /// 1-based sensor number
    pub const fn number(self) -> u8 {
        match self {
            SensorId::Hall1 => 1,
            SensorId::Hall2 => 2,
        }
    }
}

/// State of one sensor as of the last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Magnetic field present
    pub active: bool,
    /// Timestamp of the last level change
    pub last_change_at: Millis,
}

impl SensorReading {
    /// Reading seeded from an initial level
    pub const fn new(active: bool, now: Millis) -> Self {
        Self {
            active,
            last_change_at: now,
        }
    }

    /// Record a sampled level
    ///
    /// `last_change_at` only moves when the level differs from the previous
    /// sample. Returns true on an edge.
    pub fn observe(&mut self, active: bool, now: Millis) -> bool {
        if active == self.active {
            return false;
        }
        self.active = active;
        self.last_change_at = now;
        true
    }
}

/// Both sensors sampled on the same tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorSnapshot {
    pub sensor1: SensorReading,
    pub sensor2: SensorReading,
}

impl SensorSnapshot {
    /// Reading for one sensor
    pub fn get(&self, id: SensorId) -> SensorReading {
        match id {
            SensorId::Hall1 => self.sensor1,
            SensorId::Hall2 => self.sensor2,
        }
    }

    /// Check whether one sensor sees the field
    pub fn is_active(&self, id: SensorId) -> bool {
        self.get(id).active
    }
}

/// Trait for the pair of position sensors
pub trait PositionSensors {
    /// Sample both sensors and update edge bookkeeping
    ///
    /// Cannot fail.
    fn poll(&mut self, now: Millis) -> SensorSnapshot;

    /// Readings as of the last poll (no hardware access)
    fn last(&self) -> SensorSnapshot;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_edge_updates_timestamp() {
        let mut reading = SensorReading::new(false, 0);

        assert!(reading.observe(true, 120));
        assert!(reading.active);
        assert_eq!(reading.last_change_at, 120);
    }

    #[test]
    fn test_observe_level_keeps_timestamp() {
        let mut reading = SensorReading::new(true, 40);

        assert!(!reading.observe(true, 90));
        assert!(!reading.observe(true, 500));
        assert_eq!(reading.last_change_at, 40);
    }

    #[test]
    fn test_sensor_numbers() {
        assert_eq!(SensorId::from_number(1), Some(SensorId::Hall1));
        assert_eq!(SensorId::from_number(2), Some(SensorId::Hall2));
        assert_eq!(SensorId::from_number(0), None);
        assert_eq!(SensorId::from_number(3), None);
        assert_eq!(SensorId::Hall2.number(), 2);
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = SensorSnapshot {
            sensor1: SensorReading::new(false, 0),
            sensor2: SensorReading::new(true, 7),
        };
        assert!(!snapshot.is_active(SensorId::Hall1));
        assert!(snapshot.is_active(SensorId::Hall2));
        assert_eq!(snapshot.get(SensorId::Hall2).last_change_at, 7);
    }
}
