use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::line::{DigitalLine, Mode};

/// How long the line is held low to wake the sensor.
///
/// Many sensors fail to answer if this is shortened, even though the datasheet asks for just
/// 1ms. Do not lower it.
pub const WAKE_PULSE_US: u32 = 18_000;

/// How long the line is driven high before handing it over to the sensor. Must be 20-40us.
pub const RELEASE_PULSE_US: u32 = 30;

/// The maximum number of level transitions sampled per read.
pub const MAX_TRANSITIONS: usize = 85;

/// Number of polls without a transition after which the sensor is considered to have timed
/// out.
pub const TIMEOUT_TICKS: u8 = 255;

/// High durations longer than this many ticks are read as a 1 bit.
pub const ONE_BIT_THRESHOLD_TICKS: u8 = 16;

/// Transitions of the sensor's acknowledgement, which carry no data.
const PREAMBLE_TRANSITIONS: usize = 4;

/// Number of data bits in a frame, including the checksum byte.
pub const FRAME_BITS: usize = 40;

#[derive(Debug, PartialEq)]
pub enum Error<TIoError> {
    /// Wrapped error from the HAL.
    Wrapped(TIoError),
}

impl<TIoError> From<TIoError> for Error<TIoError> {
    fn from(error: TIoError) -> Error<TIoError> {
        Error::Wrapped(error)
    }
}

/// A decoded reading from the DHT22.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

impl Reading {
    /// Whether this reading lies within what a DHT22 can physically report.
    ///
    /// The sensor is rated for -40 to 80 degrees Celsius and 0-100% humidity. Some wiggle-room
    /// is left on the temperature since some sensors can go beyond this. A reading outside this
    /// range still passed its checksum, so this is informational only.
    pub fn is_plausible(&self) -> bool {
        self.humidity <= 100.0 && self.temperature >= -60.0 && self.temperature <= 150.0
    }
}

/// The five bytes sent by the sensor: humidity (2), temperature (2), and checksum (1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorFrame([u8; 5]);

impl SensorFrame {
    pub fn from_bytes(bytes: [u8; 5]) -> SensorFrame {
        SensorFrame(bytes)
    }

    /// Builds a well-formed frame from raw tenth-unit values, computing its checksum.
    ///
    /// A negative `temperature_x10` is encoded in sign-magnitude form, as the sensor does.
    pub fn encode(temperature_x10: i16, humidity_x10: u16) -> SensorFrame {
        let mut temperature = temperature_x10.unsigned_abs() & 0x7FFF;
        if temperature_x10 < 0 {
            temperature |= 0x8000;
        }
        let [h0, h1] = humidity_x10.to_be_bytes();
        let [t0, t1] = temperature.to_be_bytes();
        let mut bytes = [h0, h1, t0, t1, 0];
        bytes[4] = checksum(&bytes);
        SensorFrame(bytes)
    }

    pub fn bytes(&self) -> [u8; 5] {
        self.0
    }

    pub fn has_valid_checksum(&self) -> bool {
        self.0[4] == checksum(&self.0)
    }

    fn humidity_x10(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    fn temperature_x10(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    /// Decodes the frame, or returns `None` if the checksum does not match.
    pub fn decode(&self) -> Option<Reading> {
        if !self.has_valid_checksum() {
            return None;
        }
        let raw_temperature = self.temperature_x10();
        let mut temperature = (raw_temperature & 0x7FFF) as f32 / 10.0;
        if (raw_temperature & 0x8000) != 0 {
            temperature = -temperature;
        }
        Some(Reading {
            temperature,
            humidity: self.humidity_x10() as f32 / 10.0,
        })
    }
}

/// The low byte of the sum of the first four bytes.
fn checksum(bytes: &[u8; 5]) -> u8 {
    bytes[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

/// The result of a single read attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReadOutcome {
    /// A full frame was received and its checksum matched.
    Success(Reading),
    /// A full frame was received but its checksum did not match.
    ChecksumMismatch,
    /// The sensor stopped toggling the line before 40 bits were received.
    IncompletePulseTrain,
}

impl ReadOutcome {
    pub fn reading(&self) -> Option<Reading> {
        match self {
            ReadOutcome::Success(reading) => Some(*reading),
            _ => None,
        }
    }
}

/// How many ticks the line held each level, in the order the levels were observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPulseTrain {
    ticks: [u8; MAX_TRANSITIONS],
    len: usize,
    timed_out: bool,
}

impl RawPulseTrain {
    fn new() -> RawPulseTrain {
        RawPulseTrain {
            ticks: [0u8; MAX_TRANSITIONS],
            len: 0,
            timed_out: false,
        }
    }

    /// Builds a pulse train from already sampled tick counts.
    ///
    /// Counts beyond [`MAX_TRANSITIONS`] are dropped. A count that reached [`TIMEOUT_TICKS`]
    /// ends the train, just as it would end a live scan.
    pub fn from_ticks(ticks: &[u8]) -> RawPulseTrain {
        let mut train = RawPulseTrain::new();
        for &count in ticks.iter().take(MAX_TRANSITIONS) {
            if count >= TIMEOUT_TICKS {
                train.timed_out = true;
                break;
            }
            train.push(count);
        }
        train
    }

    fn push(&mut self, count: u8) {
        self.ticks[self.len] = count;
        self.len += 1;
    }

    /// The completed transitions. Does not include the one that timed out.
    pub fn ticks(&self) -> &[u8] {
        &self.ticks[..self.len]
    }

    /// Whether the scan was aborted because the line stopped changing.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

/// Reduces a pulse train to a read outcome.
///
/// Transitions 0-3 are the sensor's acknowledgement. Every even transition after that closes
/// the high half of a data bit, whose length determines the bit value.
pub fn decode_pulse_train(train: &RawPulseTrain) -> ReadOutcome {
    let mut bytes = [0u8; 5];
    let mut bits = 0usize;
    for (index, &count) in train.ticks().iter().enumerate() {
        if bits == FRAME_BITS {
            break;
        }
        if index < PREAMBLE_TRANSITIONS || index % 2 != 0 {
            continue;
        }
        let byte = &mut bytes[bits / 8];
        *byte <<= 1;
        if count > ONE_BIT_THRESHOLD_TICKS {
            *byte |= 1;
        }
        bits += 1;
    }

    if bits < FRAME_BITS {
        log::debug!(
            "Pulse train ended after {} of {} bits (timed out: {})",
            bits,
            FRAME_BITS,
            train.timed_out()
        );
        return ReadOutcome::IncompletePulseTrain;
    }

    let frame = SensorFrame::from_bytes(bytes);
    match frame.decode() {
        Some(reading) => ReadOutcome::Success(reading),
        None => {
            log::debug!("Checksum mismatch in frame {:02X?}", frame.bytes());
            ReadOutcome::ChecksumMismatch
        }
    }
}

/// A DHT22 (AM2302) attached to a single bit-banged line.
///
/// Each call to [`Dht22::read`] performs exactly one attempt. Callers that want retries must
/// wait at least two seconds between attempts, as the sensor will not answer sooner.
#[derive(Debug)]
pub struct Dht22<TLine, TDelay> {
    line: TLine,
    delay: TDelay,
}

impl<TLine, TError, TDelay> Dht22<TLine, TDelay>
where
    TLine: DigitalLine<Error = TError>,
    TDelay: DelayNs,
{
    /// Constructs a DHT22 that reads from the given line.
    ///
    /// The `delay` must be capable of microsecond precision, since it is also the tick source
    /// used to time the sensor's pulses.
    pub fn new(line: TLine, delay: TDelay) -> Dht22<TLine, TDelay> {
        Dht22 { line, delay }
    }

    /// Gives back the line and delay.
    pub fn release(self) -> (TLine, TDelay) {
        (self.line, self.delay)
    }

    /// Performs one read of the sensor.
    ///
    /// This blocks for the whole exchange: 18ms of wake-up pulse followed by about 4-5ms of
    /// busy polling. The line is left in input mode whatever the result.
    pub fn read(&mut self) -> Result<ReadOutcome, Error<TError>> {
        let train = self.sample_pulse_train()?;
        let outcome = decode_pulse_train(&train);
        log::trace!("Read {:?} from {} transitions", outcome, train.ticks().len());
        Ok(outcome)
    }

    /// Wakes the sensor and records the length of each level it drives onto the line.
    pub fn sample_pulse_train(&mut self) -> Result<RawPulseTrain, Error<TError>> {
        match self.request_data() {
            Ok(()) => {}
            Err(err) => {
                self.restore_input_mode();
                return Err(err);
            }
        }
        match self.receive_pulses() {
            Ok(train) => Ok(train),
            Err(err) => {
                self.restore_input_mode();
                Err(err)
            }
        }
    }

    fn request_data(&mut self) -> Result<(), Error<TError>> {
        self.line.set_mode(Mode::Output)?;
        self.line.write_level(PinState::Low)?;
        self.delay.delay_us(WAKE_PULSE_US);
        self.line.write_level(PinState::High)?;
        self.delay.delay_us(RELEASE_PULSE_US);
        self.line.set_mode(Mode::Input)?;
        Ok(())
    }

    fn receive_pulses(&mut self) -> Result<RawPulseTrain, Error<TError>> {
        let mut train = RawPulseTrain::new();
        // The line idles high, pulled up, when the sensor takes over.
        let mut last_level = PinState::High;
        for _ in 0..MAX_TRANSITIONS {
            match self.count_ticks_while(last_level)? {
                Some((count, level)) => {
                    train.push(count);
                    last_level = level;
                }
                None => {
                    train.timed_out = true;
                    break;
                }
            }
        }
        Ok(train)
    }

    /// Polls until the line leaves `level`, one tick per microsecond.
    ///
    /// Returns the tick count and the new level, or `None` if the line did not change within
    /// [`TIMEOUT_TICKS`].
    #[inline]
    fn count_ticks_while(
        &mut self,
        level: PinState,
    ) -> Result<Option<(u8, PinState)>, Error<TError>> {
        let mut counter = 0u8;
        loop {
            let current = self.line.read_level()?;
            if current != level {
                return Ok(Some((counter, current)));
            }
            counter += 1;
            self.delay.delay_us(1);
            if counter == TIMEOUT_TICKS {
                return Ok(None);
            }
        }
    }

    fn restore_input_mode(&mut self) {
        if self.line.set_mode(Mode::Input).is_err() {
            log::warn!("Could not return the sensor line to input mode");
        }
    }
}
