use super::concurrent;
use super::Event;
use dht_monitor::line::{DigitalLine, Mode};
use embedded_hal::digital::{ErrorKind, ErrorType, PinState};
use std::collections::VecDeque;

#[derive(Debug, PartialEq)]
pub enum Error {
    ReadFailed,
}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A line whose levels are scripted per read.
///
/// Each queued transmission is played back, one level per poll, after the line is switched from
/// output to input. Outside a transmission the line reads as the default level.
#[derive(Debug)]
pub struct Pin {
    name: &'static str,
    transmissions: VecDeque<Vec<u8>>,
    data_to_read: Vec<u8>,
    data_index: usize,
    default_data: bool,
    mode: Mode,
    fail_reads: bool,
}

impl Pin {
    pub fn new(name: &'static str) -> Pin {
        concurrent::reset_events(name);
        Pin {
            name: name,
            transmissions: VecDeque::new(),
            data_to_read: Vec::new(),
            data_index: 0,
            default_data: true,
            mode: Mode::Input,
            fail_reads: false,
        }
    }

    /// Queues the levels sent for the next read.
    pub fn push_data(&mut self, data: Vec<u8>) {
        self.transmissions.push_back(data);
    }

    pub fn set_default_data(&mut self, default: bool) {
        self.default_data = default;
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Every change of direction, in order.
    pub fn mode_history(name: &str) -> Vec<Mode> {
        concurrent::events(name)
            .into_iter()
            .filter_map(|event| match event {
                Event::Mode(mode) => Some(mode),
                _ => None,
            })
            .collect()
    }
}

impl ErrorType for Pin {
    type Error = Error;
}

impl DigitalLine for Pin {
    fn set_mode(&mut self, mode: Mode) -> Result<(), Self::Error> {
        concurrent::record_event(self.name, Event::Mode(mode));
        if self.mode == Mode::Output && mode == Mode::Input {
            self.data_to_read = self.transmissions.pop_front().unwrap_or_default();
            self.data_index = 0;
        }
        self.mode = mode;
        Ok(())
    }

    fn write_level(&mut self, level: PinState) -> Result<(), Self::Error> {
        concurrent::record_event(self.name, Event::Write(level));
        Ok(())
    }

    fn read_level(&mut self) -> Result<PinState, Self::Error> {
        if self.fail_reads {
            return Err(Error::ReadFailed);
        }
        if self.data_index >= self.data_to_read.len() {
            return Ok(PinState::from(self.default_data));
        }
        let level = self.data_to_read[self.data_index] > 0;
        self.data_index += 1;
        Ok(PinState::from(level))
    }
}
