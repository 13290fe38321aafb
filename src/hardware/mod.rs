use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::error::HardwareError;
use crate::line::DigitalLine;

#[cfg(feature = "rpi")]
pub mod rpi;
pub mod simulated;

/// Delays longer than this sleep instead of spinning.
const SLEEP_THRESHOLD: Duration = Duration::from_millis(2);

/// A source of [`DigitalLine`]s that needs process-wide setup and teardown.
pub trait Backend {
    type Line: DigitalLine;

    fn name(&self) -> &'static str;

    fn initialise(&mut self) -> Result<(), HardwareError>;

    fn open_line(&mut self, pin: u8) -> Result<Self::Line, HardwareError>;

    fn shutdown(&mut self);
}

/// An initialised [`Backend`], shut down again when dropped.
///
/// Holding the backend in a scope guard means the hardware is released on every exit path,
/// including early returns on setup errors.
pub struct HardwareScope<B: Backend> {
    backend: B,
}

impl<B: Backend> HardwareScope<B> {
    pub fn acquire(mut backend: B) -> Result<HardwareScope<B>, HardwareError> {
        backend.initialise()?;
        log::info!("Initialised {} hardware", backend.name());
        Ok(HardwareScope { backend })
    }

    pub fn open_line(&mut self, pin: u8) -> Result<B::Line, HardwareError> {
        let line = self.backend.open_line(pin)?;
        log::debug!("Opened line {} on {} hardware", pin, self.backend.name());
        Ok(line)
    }
}

impl<B: Backend> Drop for HardwareScope<B> {
    fn drop(&mut self) {
        self.backend.shutdown();
        log::info!("Released {} hardware", self.backend.name());
    }
}

/// A [`DelayNs`] backed by the OS clock.
///
/// Short delays busy-wait, since sleeping cannot reach the microsecond precision needed to
/// time sensor pulses.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinDelay;

impl SpinDelay {
    pub fn new() -> SpinDelay {
        SpinDelay
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let duration = Duration::from_nanos(ns as u64);
        if duration >= SLEEP_THRESHOLD {
            thread::sleep(duration);
            return;
        }
        let start = Instant::now();
        while start.elapsed() < duration {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    use embedded_hal::digital::{ErrorType, PinState};

    use crate::line::Mode;

    struct NullLine;

    impl ErrorType for NullLine {
        type Error = Infallible;
    }

    impl DigitalLine for NullLine {
        fn set_mode(&mut self, _mode: Mode) -> Result<(), Self::Error> {
            Ok(())
        }

        fn write_level(&mut self, _level: PinState) -> Result<(), Self::Error> {
            Ok(())
        }

        fn read_level(&mut self) -> Result<PinState, Self::Error> {
            Ok(PinState::High)
        }
    }

    struct TrackingBackend {
        calls: Rc<RefCell<Vec<&'static str>>>,
        fail_init: bool,
    }

    impl Backend for TrackingBackend {
        type Line = NullLine;

        fn name(&self) -> &'static str {
            "tracking"
        }

        fn initialise(&mut self) -> Result<(), HardwareError> {
            self.calls.borrow_mut().push("initialise");
            if self.fail_init {
                return Err(HardwareError::Unavailable("tracking"));
            }
            Ok(())
        }

        fn open_line(&mut self, _pin: u8) -> Result<NullLine, HardwareError> {
            self.calls.borrow_mut().push("open_line");
            Ok(NullLine)
        }

        fn shutdown(&mut self) {
            self.calls.borrow_mut().push("shutdown");
        }
    }

    #[test]
    fn scope_shuts_down_on_drop() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        {
            let mut scope = HardwareScope::acquire(TrackingBackend {
                calls: calls.clone(),
                fail_init: false,
            })
            .unwrap();
            scope.open_line(4).unwrap();
        }
        assert_eq!(*calls.borrow(), vec!["initialise", "open_line", "shutdown"]);
    }

    #[test]
    fn failed_initialise_does_not_shut_down() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let result = HardwareScope::acquire(TrackingBackend {
            calls: calls.clone(),
            fail_init: true,
        });
        assert!(result.is_err());
        assert_eq!(*calls.borrow(), vec!["initialise"]);
    }

    #[test]
    fn spin_delay_waits_at_least_requested_time() {
        let mut delay = SpinDelay::new();
        let start = Instant::now();
        delay.delay_us(200);
        assert!(start.elapsed() >= Duration::from_micros(200));
    }
}
