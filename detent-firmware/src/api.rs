//! Request-layer entry points
//!
//! Async helpers for whatever transport fronts the firmware (HTTP, serial).
//! Each helper queues a [`Request`] for the control task and waits for its
//! answer; the control task is the only owner of the controller.

// Called by the transport integration, not by the control loop
#![allow(dead_code)]

use embassy_time::{Duration, Instant, Timer};

use detent_core::config::TestPolicy;
use detent_core::endurance::{StartError, TestReport};
use detent_core::verify::VerifyOutcome;
use detent_core::{CommandError, Position, StatusReport};

use crate::channels::{
    API_LOCK, COMMAND_RESULT, REQUEST_CHANNEL, START_RESULT, STATUS_REPORT, STOP_RESULT,
    VERIFY_RESULT,
};

/// Poll interval of the synchronous verify wrapper
pub const VERIFY_POLL_MS: u64 = 10;

/// Commands handled by the control task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Pulse without verification; `None` uses the configured pulse
    SwitchTo {
        position: Position,
        pulse_ms: Option<u16>,
    },
    /// Pulse and confirm with the mapped sensor
    VerifySwitch { position: Position },
    /// Start an endurance session; `None` uses the configured policy
    StartTest(Option<TestPolicy>),
    StopTest,
    Status,
}

/// Why a synchronous verification returned without an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerifyCallError {
    /// The verification was refused
    Rejected(CommandError),
    /// No outcome before the caller's deadline; the verification keeps
    /// running and its result is dropped
    Deadline,
}

/// Pulse towards `position`
pub async fn switch_to(position: Position, pulse_ms: Option<u16>) -> Result<(), CommandError> {
    let _guard = API_LOCK.lock().await;
    COMMAND_RESULT.reset();
    REQUEST_CHANNEL
        .send(Request::SwitchTo { position, pulse_ms })
        .await;
    COMMAND_RESULT.wait().await
}

/// Start a verification; the outcome arrives on [`VERIFY_RESULT`]
pub async fn verify_switch(position: Position) -> Result<(), CommandError> {
    let _guard = API_LOCK.lock().await;
    request_verify(position).await
}

/// Verify a switch and wait for its outcome
///
/// Polls every [`VERIFY_POLL_MS`] until the verification resolves or
/// `deadline_ms` passes. [`API_LOCK`] is held for the whole exchange, so no
/// other caller can reset [`VERIFY_RESULT`] or start its own verification
/// before this one has its outcome.
pub async fn verify_switch_blocking(
    position: Position,
    deadline_ms: u64,
) -> Result<VerifyOutcome, VerifyCallError> {
    let _guard = API_LOCK.lock().await;
    request_verify(position)
        .await
        .map_err(VerifyCallError::Rejected)?;

    let deadline = Instant::now() + Duration::from_millis(deadline_ms);
    loop {
        if let Some(outcome) = VERIFY_RESULT.try_take() {
            return Ok(outcome);
        }
        if Instant::now() >= deadline {
            return Err(VerifyCallError::Deadline);
        }
        Timer::after_millis(VERIFY_POLL_MS).await;
    }
}

/// Queue a verification; the caller holds [`API_LOCK`]
async fn request_verify(position: Position) -> Result<(), CommandError> {
    COMMAND_RESULT.reset();
    VERIFY_RESULT.reset();
    REQUEST_CHANNEL
        .send(Request::VerifySwitch { position })
        .await;
    COMMAND_RESULT.wait().await
}

/// Start an endurance session
pub async fn start_test(policy: Option<TestPolicy>) -> Result<(), StartError> {
    let _guard = API_LOCK.lock().await;
    START_RESULT.reset();
    REQUEST_CHANNEL.send(Request::StartTest(policy)).await;
    START_RESULT.wait().await
}

/// Stop the endurance session
pub async fn stop_test() -> Option<TestReport> {
    let _guard = API_LOCK.lock().await;
    STOP_RESULT.reset();
    REQUEST_CHANNEL.send(Request::StopTest).await;
    STOP_RESULT.wait().await
}

/// Current status record
pub async fn status() -> StatusReport {
    let _guard = API_LOCK.lock().await;
    STATUS_REPORT.reset();
    REQUEST_CHANNEL.send(Request::Status).await;
    STATUS_REPORT.wait().await
}

/// Current status record, postcard-encoded into `buf`
pub async fn encode_status(buf: &mut [u8]) -> Result<&mut [u8], postcard::Error> {
    status().await.encode(buf)
}
