//! Board wiring
//!
//! Pin assignments for the reference board: an RP2040 with one L298N
//! channel driving the solenoid and two AH3134 hall switches at the
//! armature end positions.
//!
//! | Signal | GPIO | Notes                    |
//! |--------|------|--------------------------|
//! | IN1    | 10   | high = pulse towards A   |
//! | IN2    | 11   | high = pulse towards B   |
//! | ENA    | 12   | bridge enable            |
//! | HALL1  | 26   | pull-up, active low      |
//! | HALL2  | 27   | pull-up, active low      |

use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{PIN_10, PIN_11, PIN_12, PIN_26, PIN_27};
use embassy_rp::Peri;

use detent_core::config::MachineConfig;
use detent_core::time::Millis;
use detent_core::SolenoidController;
use detent_drivers::sensor::HallSensorPair;
use detent_drivers::solenoid::HBridgeSolenoid;
use detent_hal::{EhInput, EhOutput};

pub type Solenoid =
    HBridgeSolenoid<EhOutput<Output<'static>>, EhOutput<Output<'static>>, EhOutput<Output<'static>>>;

pub type Sensors = HallSensorPair<EhInput<Input<'static>>, EhInput<Input<'static>>>;

pub type Controller = SolenoidController<Solenoid, Sensors>;

/// Pins owned by the solenoid controller
pub struct BoardPins {
    pub in1: Peri<'static, PIN_10>,
    pub in2: Peri<'static, PIN_11>,
    pub ena: Peri<'static, PIN_12>,
    pub hall1: Peri<'static, PIN_26>,
    pub hall2: Peri<'static, PIN_27>,
}

/// Build the controller with all coil outputs de-energized
pub fn init_controller(pins: BoardPins, config: MachineConfig, now: Millis) -> Controller {
    let in1 = EhOutput::new(Output::new(pins.in1, Level::Low));
    let in2 = EhOutput::new(Output::new(pins.in2, Level::Low));
    // Enable line starts at its disabled level
    let ena_inverted = config.solenoid.enable_inverted;
    let ena_idle = if ena_inverted { Level::High } else { Level::Low };
    let ena = EhOutput::with_level(Output::new(pins.ena, ena_idle), ena_inverted);
    let solenoid = HBridgeSolenoid::from_config(in1, in2, ena, &config.solenoid);

    let hall1 = EhInput::new(Input::new(pins.hall1, Pull::Up));
    let hall2 = EhInput::new(Input::new(pins.hall2, Pull::Up));
    let sensors = HallSensorPair::new(hall1, hall2, &config.hall, now);

    SolenoidController::new(solenoid, sensors, config)
}
