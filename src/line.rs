use embedded_hal::digital::{ErrorType, PinState};

/// Direction of a [`DigitalLine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Input,
    Output,
}

/// A single GPIO line whose direction can be switched at runtime.
///
/// Single-wire sensors share one line for the host's request and the sensor's answer, so the
/// driver has to flip the line between output and input in the middle of a read. The
/// `embedded-hal` 1.0 pin traits do not model that, hence this small capability trait. Delays
/// are taken separately as an [`embedded_hal::delay::DelayNs`].
pub trait DigitalLine: ErrorType {
    /// Switches the line direction.
    fn set_mode(&mut self, mode: Mode) -> Result<(), Self::Error>;

    /// Drives the line. Only meaningful in [`Mode::Output`].
    fn write_level(&mut self, level: PinState) -> Result<(), Self::Error>;

    /// Samples the current level of the line.
    fn read_level(&mut self) -> Result<PinState, Self::Error>;
}

impl<T: DigitalLine + ?Sized> DigitalLine for &mut T {
    fn set_mode(&mut self, mode: Mode) -> Result<(), Self::Error> {
        T::set_mode(self, mode)
    }

    fn write_level(&mut self, level: PinState) -> Result<(), Self::Error> {
        T::write_level(self, level)
    }

    fn read_level(&mut self) -> Result<PinState, Self::Error> {
        T::read_level(self)
    }
}
