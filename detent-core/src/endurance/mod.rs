//! Endurance testing
//!
//! Drives the solenoid back and forth (or repeatedly into one position)
//! under a [`TestPolicy`](crate::config::TestPolicy), verifying every switch
//! and keeping per-position response statistics.

pub mod engine;
pub mod events;
pub mod stats;

pub use engine::{TestEngine, RETRY_DELAY_MS, SENSOR_TIMEOUT_MS};
pub use events::{StartError, StopReason, TestEvent, TestPhase, TestReport};
pub use stats::{ResponseStats, TestStatistics};
