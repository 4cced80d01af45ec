//! Inter-task communication channels
//!
//! The request layer talks to the control task through these statics. Each
//! request kind answers on its own signal, and [`API_LOCK`] keeps one
//! request/answer exchange in flight at a time.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use detent_core::endurance::{StartError, TestReport};
use detent_core::verify::VerifyOutcome;
use detent_core::{CommandError, StatusReport};

use crate::api::Request;

/// Channel capacity for request-layer commands
const REQUEST_CHANNEL_SIZE: usize = 4;

/// Commands from the request layer, drained once per control tick
pub static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, Request, REQUEST_CHANNEL_SIZE> =
    Channel::new();

/// Held by the request layer for one request/answer exchange
pub static API_LOCK: Mutex<CriticalSectionRawMutex, ()> = Mutex::new(());

/// Answer to `SwitchTo` and `VerifySwitch` (accepted or refused)
pub static COMMAND_RESULT: Signal<CriticalSectionRawMutex, Result<(), CommandError>> =
    Signal::new();

/// Answer to `StartTest`
pub static START_RESULT: Signal<CriticalSectionRawMutex, Result<(), StartError>> = Signal::new();

/// Answer to `StopTest`; `None` if no session was running
pub static STOP_RESULT: Signal<CriticalSectionRawMutex, Option<TestReport>> = Signal::new();

/// Answer to `Status`
pub static STATUS_REPORT: Signal<CriticalSectionRawMutex, StatusReport> = Signal::new();

/// Resolution of the last accepted manual verification
pub static VERIFY_RESULT: Signal<CriticalSectionRawMutex, VerifyOutcome> = Signal::new();
