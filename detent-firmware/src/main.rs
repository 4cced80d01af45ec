//! Detent - Bistable Solenoid Verification Firmware
//!
//! Main firmware binary for RP2040-based solenoid test boards. Pulses a
//! latching solenoid through an H-bridge, confirms every move with two hall
//! sensors, and runs endurance tests until a cycle/time limit or a jam.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_probe as _};

use detent_core::config::{parse_config, MachineConfig};

mod api;
mod board;
mod channels;
mod motion;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit machine.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../machine.toml");

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Detent firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    info!(
        "Solenoid: {} ms pulse, {} mA coil estimate, sensor timeout {} ms",
        config.solenoid.pulse_ms,
        config.coil_current_ma(),
        config.verify.timeout_ms
    );
    info!(
        "Position A -> hall {}, position B -> hall {}",
        config.verify.mapping.position_a.number(),
        config.verify.mapping.position_b.number()
    );

    let guard = motion::SharedVelocityGuard::new(&config.motion_guard);

    // Pin assignments are board-specific (see board.rs)
    let pins = board::BoardPins {
        in1: p.PIN_10,
        in2: p.PIN_11,
        ena: p.PIN_12,
        hall1: p.PIN_26,
        hall2: p.PIN_27,
    };
    let controller = board::init_controller(pins, config, tasks::control::now_ms());
    info!("H-bridge de-energized, hall sensors sampled");

    spawner.spawn(tasks::control_task(controller, guard)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded machine.toml
///
/// build.rs already validated it, so failure here means the host-side
/// checks and the firmware parser disagree; fall back to defaults.
fn load_config() -> MachineConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            warn!("Using default configuration");
            MachineConfig::default()
        }
    }
}
