//! Motion guard shared with the stepper subsystem
//!
//! The stepper firmware publishes its commanded velocity; the endurance
//! engine yields while the magnitude is above the configured deadband.

use portable_atomic::{AtomicI32, Ordering};

use detent_core::config::MotionGuardConfig;
use detent_core::traits::MotionGuard;

/// Last velocity published by the drive
static DRIVE_VELOCITY: AtomicI32 = AtomicI32::new(0);

/// Publish the drive's current velocity
#[allow(dead_code)] // called by the stepper integration
pub fn publish_drive_velocity(velocity: i32) {
    DRIVE_VELOCITY.store(velocity, Ordering::Relaxed);
}

/// Motion guard reading the published drive velocity
#[derive(Debug, Clone, Copy)]
pub struct SharedVelocityGuard {
    deadband: u32,
}

impl SharedVelocityGuard {
    pub fn new(config: &MotionGuardConfig) -> Self {
        Self {
            deadband: config.deadband,
        }
    }
}

impl MotionGuard for SharedVelocityGuard {
    fn velocity(&self) -> i32 {
        DRIVE_VELOCITY.load(Ordering::Relaxed)
    }

    fn is_moving(&self) -> bool {
        self.velocity().unsigned_abs() > self.deadband
    }
}
