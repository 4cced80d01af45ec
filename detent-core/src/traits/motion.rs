//! External motion guard
//!
//! The endurance engine shares the controller with an unrelated drive (a
//! stepper on the same board). While that drive is moving, the engine yields
//! its tick instead of pulsing the solenoid.

/// Read-only view of another subsystem's motion state
pub trait MotionGuard {
    /// Current velocity of the guarded drive (units are the drive's own)
    fn velocity(&self) -> i32;

    /// Check if the guarded drive is moving
    fn is_moving(&self) -> bool {
        self.velocity() != 0
    }
}

/// Guard for setups without another drive
#[derive(Debug, Clone, Copy, Default)]
pub struct Stationary;

impl MotionGuard for Stationary {
    fn velocity(&self) -> i32 {
        0
    }
}
