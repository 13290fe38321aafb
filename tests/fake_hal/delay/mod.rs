use super::concurrent;
use super::Event;
use embedded_hal::delay::DelayNs;

/// Returns immediately, recording how long it was asked to wait.
#[derive(Debug)]
pub struct Delay {
    name: &'static str,
}

impl Delay {
    /// Shares its event log with the [`super::digital::Pin`] of the same name.
    pub fn new(name: &'static str) -> Delay {
        Delay { name }
    }
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        concurrent::record_event(self.name, Event::DelayNs(ns));
    }

    fn delay_us(&mut self, us: u32) {
        concurrent::record_event(self.name, Event::DelayNs(us * 1000));
    }
}
