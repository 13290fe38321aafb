use std::convert::Infallible;

use embedded_hal::digital::{ErrorType, PinState};
use rppal::gpio::{Gpio, IoPin, Mode as GpioMode};

use super::Backend;
use crate::error::HardwareError;
use crate::line::{DigitalLine, Mode};

/// Raspberry Pi GPIO through the kernel's GPIO memory interface.
#[derive(Debug, Default)]
pub struct RpiBackend {
    gpio: Option<Gpio>,
}

impl RpiBackend {
    pub fn new() -> RpiBackend {
        RpiBackend { gpio: None }
    }
}

impl Backend for RpiBackend {
    type Line = RpiLine;

    fn name(&self) -> &'static str {
        "rpi"
    }

    fn initialise(&mut self) -> Result<(), HardwareError> {
        self.gpio = Some(Gpio::new()?);
        Ok(())
    }

    fn open_line(&mut self, pin: u8) -> Result<RpiLine, HardwareError> {
        let gpio = self
            .gpio
            .as_ref()
            .ok_or(HardwareError::NotInitialised("rpi"))?;
        Ok(RpiLine(gpio.get(pin)?.into_io(GpioMode::Input)))
    }

    fn shutdown(&mut self) {
        self.gpio = None;
    }
}

/// A BCM GPIO pin. Goes back to its previous mode when dropped.
#[derive(Debug)]
pub struct RpiLine(IoPin);

impl ErrorType for RpiLine {
    type Error = Infallible;
}

impl DigitalLine for RpiLine {
    fn set_mode(&mut self, mode: Mode) -> Result<(), Self::Error> {
        self.0.set_mode(match mode {
            Mode::Input => GpioMode::Input,
            Mode::Output => GpioMode::Output,
        });
        Ok(())
    }

    fn write_level(&mut self, level: PinState) -> Result<(), Self::Error> {
        match level {
            PinState::High => self.0.set_high(),
            PinState::Low => self.0.set_low(),
        }
        Ok(())
    }

    fn read_level(&mut self) -> Result<PinState, Self::Error> {
        Ok(PinState::from(self.0.is_high()))
    }
}
