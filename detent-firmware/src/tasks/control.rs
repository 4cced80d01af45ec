//! Solenoid control task
//!
//! Owns the controller. Runs one controller tick every
//! [`TICK_INTERVAL_MS`] and handles request-layer commands as they arrive,
//! so the actuator, sensors, verifier and engine are only ever touched from
//! this task.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Ticker};

use detent_core::endurance::{TestEvent, TestReport};
use detent_core::time::Millis;
use detent_core::verify::{VerifyOutcome, VerifyPoll};

use crate::api::Request;
use crate::board::Controller;
use crate::channels::{
    COMMAND_RESULT, REQUEST_CHANNEL, START_RESULT, STATUS_REPORT, STOP_RESULT, VERIFY_RESULT,
};
use crate::motion::SharedVelocityGuard;

/// Control loop period in milliseconds
pub const TICK_INTERVAL_MS: u64 = 10;

/// Millisecond timestamp for the controller
///
/// Truncated to 32 bits; the core compares timestamps with wrapping
/// arithmetic.
pub fn now_ms() -> Millis {
    Instant::now().as_millis() as Millis
}

/// Control task - owns the controller and runs the control loop
#[embassy_executor::task]
pub async fn control_task(mut controller: Controller, guard: SharedVelocityGuard) {
    info!("Control task started ({} ms tick)", TICK_INTERVAL_MS);

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));

    loop {
        match select(REQUEST_CHANNEL.receive(), ticker.next()).await {
            Either::First(request) => handle_request(&mut controller, request, now_ms()),
            Either::Second(()) => {
                let out = controller.tick(now_ms(), &guard);
                report_verify(out.verify);
                report_test_event(&out.test);
            }
        }
    }
}

fn handle_request(controller: &mut Controller, request: Request, now: Millis) {
    match request {
        Request::SwitchTo { position, pulse_ms } => {
            let result = controller.switch_to(position, pulse_ms, now);
            match result {
                Ok(()) => info!("Switch to {} issued", position.label()),
                Err(e) => warn!("Switch to {} refused: {:?}", position.label(), e),
            }
            COMMAND_RESULT.signal(result);
        }
        Request::VerifySwitch { position } => {
            let result = controller.verify_switch(position, now);
            match result {
                Ok(()) => info!("Verify switch to {} started", position.label()),
                Err(e) => warn!("Verify switch to {} refused: {:?}", position.label(), e),
            }
            COMMAND_RESULT.signal(result);
        }
        Request::StartTest(policy) => {
            let result = controller.start_test(policy, now);
            match result {
                Ok(event) => report_test_event(&event),
                Err(e) => warn!("Endurance test refused: {:?}", e),
            }
            START_RESULT.signal(result.map(|_| ()));
        }
        Request::StopTest => {
            let report = controller.stop_test(now);
            match &report {
                Some(report) => log_report(report),
                None => debug!("Stop requested with no test running"),
            }
            STOP_RESULT.signal(report);
        }
        Request::Status => {
            STATUS_REPORT.signal(controller.status(now));
        }
    }
}

fn report_verify(poll: VerifyPoll) {
    let VerifyPoll::Resolved(outcome) = poll else {
        return;
    };

    match outcome {
        VerifyOutcome::Confirmed { response_ms } => {
            info!("Switch verified, sensor response {} ms", response_ms);
        }
        VerifyOutcome::TimedOut => {
            warn!("Switch not verified: sensor timeout");
        }
    }
    VERIFY_RESULT.signal(outcome);
}

fn report_test_event(event: &TestEvent) {
    match event {
        TestEvent::Idle | TestEvent::Yielded => {}
        TestEvent::Started(policy) => {
            info!(
                "Endurance test started: direction {}, pulse {} ms, cooldown {} ms",
                policy.direction.label(),
                policy.pulse_ms,
                policy.cooldown_ms
            );
            info!(
                "Limits: {} cycles, {} ms (0 = none), {} attempts per switch, jam after {} failures",
                policy.max_cycles,
                policy.max_total_time_ms,
                policy.max_attempts,
                policy.max_consecutive_failures
            );
        }
        TestEvent::SwitchIssued {
            position,
            attempt,
            max_attempts,
        } => {
            debug!(
                "Pulse towards {} (attempt {}/{})",
                position.label(),
                attempt,
                max_attempts
            );
        }
        TestEvent::PhaseChanged(phase) => debug!("Test phase: {:?}", phase),
        TestEvent::SwitchSucceeded {
            position,
            response_ms,
            cycle_count,
        } => {
            info!(
                "Switch to {} OK in {} ms (cycle {})",
                position.label(),
                response_ms,
                cycle_count
            );
        }
        TestEvent::AttemptFailed {
            position,
            attempt,
            max_attempts,
        } => {
            warn!(
                "Sensor timeout at {} (attempt {}/{}), retrying",
                position.label(),
                attempt,
                max_attempts
            );
        }
        TestEvent::SwitchFailed {
            position,
            consecutive_failures,
            limit,
            next_target,
        } => {
            warn!(
                "Switch to {} failed ({}/{} in a row), next target {}",
                position.label(),
                consecutive_failures,
                limit,
                next_target.label()
            );
        }
        TestEvent::SessionStopped(report) => log_report(report),
    }
}

/// Log the final statistics block of a session
fn log_report(report: &TestReport) {
    if report.reason.is_fault() {
        error!("Endurance test stopped: {}", report.reason.message().as_str());
    } else {
        info!("Endurance test stopped: {}", report.reason.message().as_str());
    }

    let stats = &report.stats;
    info!(
        "Duration {} ms, {} cycles, {} pulses, {} ok, {} failed",
        report.duration_ms,
        report.cycle_count,
        stats.total_switches,
        stats.successful_switches,
        stats.failed_switches
    );

    if let Some(rate) = report.success_rate_permille() {
        info!("Success rate {}.{}%", rate / 10, rate % 10);
    }
    if let (Some(avg), Some(min), Some(max)) = (
        report.average_ms_x10(),
        stats.overall.min(),
        stats.overall.max(),
    ) {
        info!(
            "Response avg {}.{} ms, min {} ms, max {} ms",
            avg / 10,
            avg % 10,
            min,
            max
        );
    }
    for position in [detent_core::Position::A, detent_core::Position::B] {
        let s = stats.position(position);
        if let Some(avg) = s.average_ms_x10() {
            info!(
                "Position {}: {} switches, avg {}.{} ms",
                position.label(),
                s.count,
                avg / 10,
                avg % 10
            );
        }
    }
}
