//! Test doubles: a fake actuator, fake sensors and a small plant model
//!
//! The [`Rig`] simulates the armature: when a pulse towards a position
//! completes, the armature leaves its current end and arrives at the target
//! `travel_ms` later, unless that position is jammed. Sensors follow the
//! armature through the configured mapping.

use crate::config::SensorMapping;
use crate::time::{elapsed, reached, Millis};
use crate::traits::{
    ActuatorError, BistableActuator, Position, PositionSensors, SensorId, SensorSnapshot,
};

#[derive(Debug, Clone, Copy)]
struct Pulse {
    target: Position,
    started_at: Millis,
    duration_ms: u16,
}

/// Actuator double with the same pulse bookkeeping as the H-bridge driver
#[derive(Debug, Default)]
pub struct FakeActuator {
    pulse: Option<Pulse>,
    position: Option<Position>,
    completed: Option<Position>,
    pub pulses_issued: u32,
}

impl FakeActuator {
    /// Position of a pulse that completed since the last call
    pub fn take_completed(&mut self) -> Option<Position> {
        self.completed.take()
    }
}

impl BistableActuator for FakeActuator {
    fn switch_to(
        &mut self,
        position: Position,
        duration_ms: u16,
        now: Millis,
    ) -> Result<(), ActuatorError> {
        if self.pulse.is_some() {
            return Err(ActuatorError::Busy);
        }
        self.pulse = Some(Pulse {
            target: position,
            started_at: now,
            duration_ms,
        });
        self.pulses_issued += 1;
        Ok(())
    }

    fn poll_pulse_complete(&mut self, now: Millis) -> bool {
        if let Some(pulse) = self.pulse {
            if elapsed(now, pulse.started_at) >= pulse.duration_ms as u32 {
                self.pulse = None;
                self.position = Some(pulse.target);
                self.completed = Some(pulse.target);
            }
        }
        self.pulse.is_some()
    }

    fn is_pulse_active(&self) -> bool {
        self.pulse.is_some()
    }

    fn is_enabled(&self) -> bool {
        self.pulse.is_some()
    }

    fn position(&self) -> Option<Position> {
        self.position
    }
}

/// Sensors whose levels the test sets directly
#[derive(Debug, Default)]
pub struct FakeSensors {
    levels: [bool; 2],
    last: SensorSnapshot,
}

impl FakeSensors {
    pub fn set(&mut self, id: SensorId, active: bool) {
        self.levels[id.number() as usize - 1] = active;
    }
}

impl PositionSensors for FakeSensors {
    fn poll(&mut self, now: Millis) -> SensorSnapshot {
        self.last.sensor1.observe(self.levels[0], now);
        self.last.sensor2.observe(self.levels[1], now);
        self.last
    }

    fn last(&self) -> SensorSnapshot {
        self.last
    }
}

/// Simulated solenoid with hall sensors
pub struct Rig {
    pub actuator: FakeActuator,
    pub sensors: FakeSensors,
    pub mapping: SensorMapping,
    /// Armature end position, `None` while travelling or before homing
    pub armature: Option<Position>,
    /// Time from pulse end until the armature reaches the target
    pub travel_ms: u32,
    /// Positions the armature cannot reach
    pub jammed: [bool; 2],
    arrival: Option<(Position, Millis)>,
}

impl Rig {
    pub fn new(travel_ms: u32) -> Self {
        Self {
            actuator: FakeActuator::default(),
            sensors: FakeSensors::default(),
            mapping: SensorMapping::default(),
            armature: None,
            travel_ms,
            jammed: [false; 2],
            arrival: None,
        }
    }

    pub fn jam(&mut self, position: Position) {
        self.jammed[position.index()] = true;
    }

    pub fn unjam(&mut self, position: Position) {
        self.jammed[position.index()] = false;
    }

    /// Poll the actuator, move the armature, and sample the sensors
    pub fn tick(&mut self, now: Millis) -> SensorSnapshot {
        self.actuator.poll_pulse_complete(now);
        self.update_plant(now);
        self.sensors.poll(now)
    }

    fn update_plant(&mut self, now: Millis) {
        if let Some(target) = self.actuator.take_completed() {
            if !self.jammed[target.index()] && self.armature != Some(target) {
                self.armature = None;
                self.arrival = Some((target, now.wrapping_add(self.travel_ms)));
            }
        }
        if let Some((target, at)) = self.arrival {
            if reached(now, at) {
                self.armature = Some(target);
                self.arrival = None;
            }
        }
        for position in [Position::A, Position::B] {
            let sensor = self.mapping.sensor_for(position);
            self.sensors.set(sensor, self.armature == Some(position));
        }
    }
}
