//! Hall-effect position sensors
//!
//! AH3134-style switches have an open-collector output that pulls the line
//! low while a magnet is in front of them, so "active" is usually a low
//! level. No software filtering: the switch's own hysteresis is relied on,
//! and each poll only timestamps level changes.

use detent_core::config::HallSensorConfig;
use detent_core::time::Millis;
use detent_core::traits::{PositionSensors, SensorReading, SensorSnapshot};
use detent_hal::InputPin;

/// One hall switch on a digital input
pub struct HallSensor<P> {
    pin: P,
    /// If true, field present = pin LOW
    active_low: bool,
    reading: SensorReading,
}

impl<P: InputPin> HallSensor<P> {
    /// Create a sensor, seeding the reading from the current level
    pub fn new(mut pin: P, config: HallSensorConfig, now: Millis) -> Self {
        let active = pin.is_high() != config.active_low;
        Self {
            pin,
            active_low: config.active_low,
            reading: SensorReading::new(active, now),
        }
    }

    /// Sample the pin
    pub fn poll(&mut self, now: Millis) -> SensorReading {
        let active = self.pin.is_high() != self.active_low;
        self.reading.observe(active, now);
        self.reading
    }

    /// Reading as of the last poll
    pub fn reading(&self) -> SensorReading {
        self.reading
    }
}

/// The two hall sensors watching the armature
pub struct HallSensorPair<P1, P2> {
    sensor1: HallSensor<P1>,
    sensor2: HallSensor<P2>,
}

impl<P1: InputPin, P2: InputPin> HallSensorPair<P1, P2> {
    /// Create the pair from the two inputs and their configs
    pub fn new(pin1: P1, pin2: P2, config: &[HallSensorConfig; 2], now: Millis) -> Self {
        Self {
            sensor1: HallSensor::new(pin1, config[0], now),
            sensor2: HallSensor::new(pin2, config[1], now),
        }
    }
}

impl<P1: InputPin, P2: InputPin> PositionSensors for HallSensorPair<P1, P2> {
    fn poll(&mut self, now: Millis) -> SensorSnapshot {
        SensorSnapshot {
            sensor1: self.sensor1.poll(now),
            sensor2: self.sensor2.poll(now),
        }
    }

    fn last(&self) -> SensorSnapshot {
        SensorSnapshot {
            sensor1: self.sensor1.reading(),
            sensor2: self.sensor2.reading(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use detent_core::traits::SensorId;

    /// Input whose level the test changes through a shared cell
    struct MockInput<'a> {
        level: &'a Cell<bool>,
    }

    impl InputPin for MockInput<'_> {
        fn is_high(&mut self) -> bool {
            self.level.get()
        }
    }

    const ACTIVE_LOW: HallSensorConfig = HallSensorConfig { active_low: true };
    const ACTIVE_HIGH: HallSensorConfig = HallSensorConfig { active_low: false };

    #[test]
    fn test_active_low_polarity() {
        let level = Cell::new(true);
        let mut sensor = HallSensor::new(MockInput { level: &level }, ACTIVE_LOW, 0);
        assert!(!sensor.reading().active);

        level.set(false);
        assert!(sensor.poll(10).active);
    }

    #[test]
    fn test_active_high_polarity() {
        let level = Cell::new(true);
        let sensor = HallSensor::new(MockInput { level: &level }, ACTIVE_HIGH, 0);
        assert!(sensor.reading().active);
    }

    #[test]
    fn test_timestamp_only_on_edge() {
        let level = Cell::new(true);
        let mut sensor = HallSensor::new(MockInput { level: &level }, ACTIVE_LOW, 5);

        assert_eq!(sensor.poll(10).last_change_at, 5);

        level.set(false);
        assert_eq!(sensor.poll(20).last_change_at, 20);
        assert_eq!(sensor.poll(30).last_change_at, 20);

        level.set(true);
        let reading = sensor.poll(40);
        assert!(!reading.active);
        assert_eq!(reading.last_change_at, 40);
    }

    #[test]
    fn test_pair_snapshot() {
        let l1 = Cell::new(true);
        let l2 = Cell::new(true);
        let mut pair = HallSensorPair::new(
            MockInput { level: &l1 },
            MockInput { level: &l2 },
            &[ACTIVE_LOW; 2],
            0,
        );

        l2.set(false);
        let snapshot = pair.poll(15);
        assert!(!snapshot.is_active(SensorId::Hall1));
        assert!(snapshot.is_active(SensorId::Hall2));
        assert_eq!(snapshot.sensor2.last_change_at, 15);
        assert_eq!(pair.last(), snapshot);
    }
}
