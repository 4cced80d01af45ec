//! Adapters for `embedded-hal` 1.0 pins
//!
//! Chip HALs such as `embassy-rp` implement the `embedded-hal` digital traits
//! with `Error = Infallible`. These wrappers turn such pins into the
//! [`crate::gpio`] traits without any `unwrap`: the error type is
//! uninhabited, so the error arm is statically unreachable.
//!
//! ```ignore
//! let in1 = EhOutput::new(Output::new(p.PIN_10, Level::Low));
//! let hall = EhInput::new(Input::new(p.PIN_26, Pull::Up));
//! ```

use core::convert::Infallible;

use embedded_hal::digital;

use crate::gpio::{InputPin, OutputPin};

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Output pin wrapper that tracks the level it last drove
///
/// `embedded-hal` only exposes readback through `StatefulOutputPin`, which
/// needs `&mut self`; the driver asks for the level through `&self`, so the
/// last written level is cached here instead.
pub struct EhOutput<P> {
    pin: P,
    high: bool,
}

impl<P> EhOutput<P>
where
    P: digital::OutputPin<Error = Infallible>,
{
    /// Wrap a pin and drive it low
    pub fn new(mut pin: P) -> Self {
        infallible(pin.set_low());
        Self { pin, high: false }
    }

    /// Wrap a pin and drive it to the given level
    ///
    /// For outputs whose safe idle level is high, such as an active-low
    /// enable line.
    pub fn with_level(mut pin: P, high: bool) -> Self {
        if high {
            infallible(pin.set_high());
        } else {
            infallible(pin.set_low());
        }
        Self { pin, high }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> OutputPin for EhOutput<P>
where
    P: digital::OutputPin<Error = Infallible>,
{
    fn set_high(&mut self) {
        infallible(self.pin.set_high());
        self.high = true;
    }

    fn set_low(&mut self) {
        infallible(self.pin.set_low());
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Input pin wrapper
pub struct EhInput<P> {
    pin: P,
}

impl<P> EhInput<P>
where
    P: digital::InputPin<Error = Infallible>,
{
    /// Wrap an input pin
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> InputPin for EhInput<P>
where
    P: digital::InputPin<Error = Infallible>,
{
    fn is_high(&mut self) -> bool {
        infallible(self.pin.is_high())
    }

    fn is_low(&mut self) -> bool {
        infallible(self.pin.is_low())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mock embedded-hal pin for testing
    struct MockPin {
        level: bool,
        writes: u32,
    }

    impl MockPin {
        fn new(level: bool) -> Self {
            Self { level, writes: 0 }
        }
    }

    impl digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl digital::OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.level = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.level = true;
            self.writes += 1;
            Ok(())
        }
    }

    impl digital::InputPin for MockPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.level)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.level)
        }
    }

    #[test]
    fn test_output_starts_low() {
        let out = EhOutput::new(MockPin::new(true));
        assert!(out.is_set_low());

        let pin = out.into_inner();
        assert!(!pin.level);
        assert_eq!(pin.writes, 1);
    }

    #[test]
    fn test_output_tracks_written_level() {
        let mut out = EhOutput::new(MockPin::new(false));

        out.set_high();
        assert!(out.is_set_high());

        out.set_state(false);
        assert!(out.is_set_low());
        assert!(!out.into_inner().level);
    }

    #[test]
    fn test_output_with_idle_high() {
        let out = EhOutput::with_level(MockPin::new(false), true);
        assert!(out.is_set_high());
        assert!(out.into_inner().level);
    }

    #[test]
    fn test_input_reads_through() {
        let mut input = EhInput::new(MockPin::new(false));
        assert!(input.is_low());

        let mut input = EhInput::new(MockPin::new(true));
        assert!(input.is_high());
    }
}
