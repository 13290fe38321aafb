#![allow(dead_code)]

pub mod concurrent;
pub mod delay;
pub mod digital;

use dht_monitor::line::Mode;
use embedded_hal::digital::PinState;

/// Something the driver did to the fake hardware.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    Mode(Mode),
    Write(PinState),
    DelayNs(u32),
}

/// Line levels, one per poll, for a full transmission of `bytes`.
///
/// Every level is held one sample longer than the tick count the driver should report, since
/// the first sample of a new level is the one that ends the previous count.
pub fn create_data_vec(bytes: [u8; 5]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut hold = |level: u8, samples: usize| data.extend(std::iter::repeat(level).take(samples));
    // Release, then ACK.
    hold(1, 2);
    hold(0, 20);
    hold(1, 20);
    for &byte in bytes.iter() {
        for bit in (0..8).rev() {
            hold(0, 12);
            match (byte >> bit) & 1 {
                0 => hold(1, 5),
                _ => hold(1, 30),
            }
        }
    }
    // END
    hold(0, 12);
    data
}
