//! Endurance test statistics
//!
//! Integer only. Averages are reported in 0.1 ms units and the success rate
//! in permille.

use crate::traits::Position;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Running sum/min/max of sensor response times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResponseStats {
    /// Samples recorded
    pub count: u32,
    /// Sum of response times (ms)
    pub sum_ms: u64,
    /// Fastest response (ms), meaningless while `count == 0`
    pub min_ms: u16,
    /// Slowest response (ms)
    pub max_ms: u16,
}

impl ResponseStats {
    /// Add one response time
    pub fn record(&mut self, response_ms: u16) {
        if self.count == 0 || response_ms < self.min_ms {
            self.min_ms = response_ms;
        }
        if response_ms > self.max_ms {
            self.max_ms = response_ms;
        }
        self.sum_ms += response_ms as u64;
        self.count = self.count.saturating_add(1);
    }

    /// Average response time in 0.1 ms units, rounded
    pub fn average_ms_x10(&self) -> Option<u32> {
        if self.count == 0 {
            return None;
        }
        let count = self.count as u64;
        Some(((self.sum_ms * 10 + count / 2) / count) as u32)
    }

    /// Fastest response, if any
    pub fn min(&self) -> Option<u16> {
        (self.count > 0).then_some(self.min_ms)
    }

    /// Slowest response, if any
    pub fn max(&self) -> Option<u16> {
        (self.count > 0).then_some(self.max_ms)
    }
}

/// Counters and response times of one endurance session
///
/// `successful_switches + failed_switches <= total_switches` always holds:
/// every pulse counts towards the total, and a switch is resolved as
/// successful or failed at most once after at least one pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TestStatistics {
    /// Pulses issued, retries included
    pub total_switches: u32,
    /// Switches confirmed by the sensor
    pub successful_switches: u32,
    /// Switches that exhausted all attempts
    pub failed_switches: u32,
    /// Response times over all positions
    pub overall: ResponseStats,
    /// Response times per position, indexed by [`Position::index`]
    pub per_position: [ResponseStats; 2],
}

impl TestStatistics {
    /// Clear everything for a new session
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Count one issued pulse
    pub fn record_pulse(&mut self) {
        self.total_switches = self.total_switches.saturating_add(1);
    }

    /// Count a confirmed switch
    pub fn record_success(&mut self, position: Position, response_ms: u16) {
        self.successful_switches = self.successful_switches.saturating_add(1);
        self.overall.record(response_ms);
        self.per_position[position.index()].record(response_ms);
    }

    /// Count a switch whose attempts are all exhausted
    pub fn record_failure(&mut self) {
        self.failed_switches = self.failed_switches.saturating_add(1);
    }

    /// Response times for one position
    pub fn position(&self, position: Position) -> &ResponseStats {
        &self.per_position[position.index()]
    }

    /// Successful switches at one position
    pub fn switches_at(&self, position: Position) -> u32 {
        self.per_position[position.index()].count
    }

    /// Confirmed switches per issued pulse, in permille
    ///
    /// Retries count as pulses, so a switch that needed three attempts
    /// lowers the rate.
    pub fn success_rate_permille(&self) -> Option<u16> {
        if self.total_switches == 0 {
            return None;
        }
        Some((self.successful_switches as u64 * 1000 / self.total_switches as u64) as u16)
    }
}
