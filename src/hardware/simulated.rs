use std::collections::VecDeque;
use std::convert::Infallible;

use embedded_hal::digital::{ErrorType, PinState};

use super::Backend;
use crate::dht22::SensorFrame;
use crate::error::HardwareError;
use crate::line::{DigitalLine, Mode};

// Samples per level. Bit lengths are chosen to sit well either side of the decoder's
// one-bit threshold.
const RELEASE_SAMPLES: usize = 2;
const ACK_SAMPLES: usize = 20;
const BIT_LOW_SAMPLES: usize = 12;
const ZERO_HIGH_SAMPLES: usize = 5;
const ONE_HIGH_SAMPLES: usize = 30;

/// A backend with a virtual DHT22 attached to every pin.
#[derive(Debug)]
pub struct SimulatedBackend {
    frame: SensorFrame,
    initialised: bool,
}

impl SimulatedBackend {
    /// A sensor that always reports the given conditions.
    pub fn new(temperature: f32, humidity: f32) -> SimulatedBackend {
        SimulatedBackend {
            frame: SensorFrame::encode(
                (temperature * 10.0).round() as i16,
                (humidity * 10.0).round() as u16,
            ),
            initialised: false,
        }
    }
}

impl Backend for SimulatedBackend {
    type Line = SimulatedLine;

    fn name(&self) -> &'static str {
        "simulated"
    }

    fn initialise(&mut self) -> Result<(), HardwareError> {
        self.initialised = true;
        Ok(())
    }

    fn open_line(&mut self, _pin: u8) -> Result<SimulatedLine, HardwareError> {
        if !self.initialised {
            return Err(HardwareError::NotInitialised(self.name()));
        }
        Ok(SimulatedLine::new(self.frame))
    }

    fn shutdown(&mut self) {
        self.initialised = false;
    }
}

/// A line with a virtual DHT22 on the other end.
///
/// The sensor answers when the line is pulled low, released high, and switched to input, in
/// that order. Until then, or once its answer is over, the line idles high.
#[derive(Debug)]
pub struct SimulatedLine {
    frame: SensorFrame,
    mode: Mode,
    driven: PinState,
    woken: bool,
    pending: VecDeque<PinState>,
}

impl SimulatedLine {
    pub fn new(frame: SensorFrame) -> SimulatedLine {
        SimulatedLine {
            frame,
            mode: Mode::Input,
            driven: PinState::High,
            woken: false,
            pending: VecDeque::new(),
        }
    }

    fn transmission(&self) -> VecDeque<PinState> {
        let mut levels = VecDeque::new();
        let mut hold = |level: PinState, samples: usize| {
            levels.extend(core::iter::repeat(level).take(samples));
        };
        hold(PinState::High, RELEASE_SAMPLES);
        hold(PinState::Low, ACK_SAMPLES);
        hold(PinState::High, ACK_SAMPLES);
        for byte in self.frame.bytes() {
            for bit in (0..8).rev() {
                hold(PinState::Low, BIT_LOW_SAMPLES);
                if (byte >> bit) & 1 == 1 {
                    hold(PinState::High, ONE_HIGH_SAMPLES);
                } else {
                    hold(PinState::High, ZERO_HIGH_SAMPLES);
                }
            }
        }
        hold(PinState::Low, BIT_LOW_SAMPLES);
        levels
    }
}

impl ErrorType for SimulatedLine {
    type Error = Infallible;
}

impl DigitalLine for SimulatedLine {
    fn set_mode(&mut self, mode: Mode) -> Result<(), Self::Error> {
        match mode {
            Mode::Output => {
                self.pending.clear();
                self.woken = false;
            }
            Mode::Input => {
                if self.mode == Mode::Output && self.woken && self.driven == PinState::High {
                    self.pending = self.transmission();
                }
                self.woken = false;
            }
        }
        self.mode = mode;
        Ok(())
    }

    fn write_level(&mut self, level: PinState) -> Result<(), Self::Error> {
        if self.mode == Mode::Output && level == PinState::Low {
            self.woken = true;
        }
        self.driven = level;
        Ok(())
    }

    fn read_level(&mut self) -> Result<PinState, Self::Error> {
        if self.mode == Mode::Output {
            return Ok(self.driven);
        }
        Ok(self.pending.pop_front().unwrap_or(PinState::High))
    }
}
