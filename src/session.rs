use core::fmt::Debug;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use embedded_hal::delay::DelayNs;

use crate::dht22::{self, Dht22, ReadOutcome, Reading};
use crate::error::SetupError;
use crate::line::DigitalLine;

/// Temperature, in degrees Celsius, above which clients are alerted.
pub const DEFAULT_TEMPERATURE_THRESHOLD: f32 = 35.0;
/// Relative humidity, in percent, above which clients are alerted.
pub const DEFAULT_HUMIDITY_THRESHOLD: f32 = 60.0;

pub const TEMPERATURE_ALERT: &str = "Abnormal temperature detected.";
pub const HUMIDITY_ALERT: &str = "Abnormal humidity detected.";
pub const READ_FAILED: &str = "Sensor read failed";
pub const UNKNOWN_COMMAND: &str = "Unknown command";

/// Largest message read from the client in one go.
const RECEIVE_BUFFER_LEN: usize = 1024;

/// Anything that can be asked for a single reading.
pub trait Sensor {
    type Error: Debug;

    fn read(&mut self) -> Result<ReadOutcome, Self::Error>;
}

impl<TLine, TError, TDelay> Sensor for Dht22<TLine, TDelay>
where
    TLine: DigitalLine<Error = TError>,
    TError: Debug,
    TDelay: DelayNs,
{
    type Error = dht22::Error<TError>;

    fn read(&mut self) -> Result<ReadOutcome, Self::Error> {
        Dht22::read(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub temperature: f32,
    pub humidity: f32,
}

impl Default for Thresholds {
    fn default() -> Thresholds {
        Thresholds {
            temperature: DEFAULT_TEMPERATURE_THRESHOLD,
            humidity: DEFAULT_HUMIDITY_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alert {
    HighTemperature,
    HighHumidity,
}

impl Alert {
    /// At most one alert is raised per reading. High temperature wins over high humidity.
    pub fn evaluate(reading: &Reading, thresholds: &Thresholds) -> Option<Alert> {
        if reading.temperature > thresholds.temperature {
            Some(Alert::HighTemperature)
        } else if reading.humidity > thresholds.humidity {
            Some(Alert::HighHumidity)
        } else {
            None
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Alert::HighTemperature => TEMPERATURE_ALERT,
            Alert::HighHumidity => HUMIDITY_ALERT,
        }
    }
}

/// Client commands, matched on their prefix only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Get,
    Exit,
    Unknown,
}

impl Command {
    pub fn parse(message: &[u8]) -> Command {
        if message.starts_with(b"GET") {
            Command::Get
        } else if message.starts_with(b"EXIT") {
            Command::Exit
        } else {
            Command::Unknown
        }
    }
}

pub fn format_reading(reading: &Reading) -> String {
    format!(
        "Temperature: {:.1}°C, Humidity: {:.1}%",
        reading.temperature, reading.humidity
    )
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed its end of the connection.
    PeerClosed,
    /// The client sent `EXIT`.
    ExitRequested,
    /// Reading from or writing to the client failed.
    ConnectionLost,
}

/// What to send back for one client message.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    /// Sent before the response, whatever the command was.
    pub alert: Option<Alert>,
    pub response: Option<String>,
    pub end: Option<SessionEnd>,
}

/// The state of one client connection.
pub struct Session<'a, TSensor> {
    sensor: &'a mut TSensor,
    thresholds: Thresholds,
}

impl<'a, TSensor: Sensor> Session<'a, TSensor> {
    pub fn new(sensor: &'a mut TSensor, thresholds: Thresholds) -> Session<'a, TSensor> {
        Session { sensor, thresholds }
    }

    /// Reads the sensor once and works out the reply to `message`.
    pub fn handle_message(&mut self, message: &[u8]) -> Reply {
        let reading = self.read_sensor();
        let alert = reading
            .as_ref()
            .and_then(|reading| Alert::evaluate(reading, &self.thresholds));
        if let Some(alert) = alert {
            log::warn!("{:?} alert raised by {:?}", alert, reading);
        }

        let (response, end) = match Command::parse(message) {
            Command::Get => (
                Some(match reading {
                    Some(reading) => format_reading(&reading),
                    None => READ_FAILED.to_string(),
                }),
                None,
            ),
            Command::Exit => {
                log::info!("Client asked to end the session");
                (None, Some(SessionEnd::ExitRequested))
            }
            Command::Unknown => (Some(UNKNOWN_COMMAND.to_string()), None),
        };
        Reply {
            alert,
            response,
            end,
        }
    }

    fn read_sensor(&mut self) -> Option<Reading> {
        match self.sensor.read() {
            Ok(ReadOutcome::Success(reading)) => {
                if !reading.is_plausible() {
                    log::warn!("Sensor reported an implausible reading: {:?}", reading);
                }
                Some(reading)
            }
            Ok(outcome) => {
                log::warn!("Sensor read failed: {:?}", outcome);
                None
            }
            Err(err) => {
                log::error!("Sensor hardware error: {:?}", err);
                None
            }
        }
    }

    /// Serves one message at a time until the client disconnects or asks to exit.
    pub fn serve<TStream: Read + Write>(
        &mut self,
        stream: &mut TStream,
    ) -> io::Result<SessionEnd> {
        let mut buffer = [0u8; RECEIVE_BUFFER_LEN];
        loop {
            let len = stream.read(&mut buffer)?;
            if len == 0 {
                log::info!("Client disconnected");
                return Ok(SessionEnd::PeerClosed);
            }
            let message = &buffer[..len];
            log::info!(
                "Received from client: {}",
                String::from_utf8_lossy(message).trim_end()
            );

            let reply = self.handle_message(message);
            if let Some(alert) = reply.alert {
                send(stream, alert.message())?;
            }
            if let Some(response) = &reply.response {
                send(stream, response)?;
            }
            if let Some(end) = reply.end {
                return Ok(end);
            }
        }
    }
}

fn send<TStream: Write>(stream: &mut TStream, text: &str) -> io::Result<()> {
    stream.write_all(text.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()
}

/// A TCP listener handing connections to [`Session`]s, one at a time.
pub struct Server {
    listener: TcpListener,
    thresholds: Thresholds,
}

impl Server {
    pub fn bind<A: ToSocketAddrs + Debug>(
        addr: A,
        thresholds: Thresholds,
    ) -> Result<Server, SetupError> {
        let listener = TcpListener::bind(&addr).map_err(|source| SetupError::Bind {
            addr: format!("{:?}", addr),
            source,
        })?;
        Ok(Server {
            listener,
            thresholds,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts a single client and serves it until the session ends.
    pub fn serve_one<TSensor: Sensor>(
        &self,
        sensor: &mut TSensor,
    ) -> Result<SessionEnd, SetupError> {
        let (stream, peer) = self.listener.accept().map_err(SetupError::Accept)?;
        log::info!("Client connected from {}", peer);
        Ok(self.serve_connection(stream, sensor))
    }

    /// Accepts clients forever, serving each to completion before taking the next.
    pub fn serve_forever<TSensor: Sensor>(&self, sensor: &mut TSensor) -> ! {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    log::info!("Client connected from {}", peer);
                    let end = self.serve_connection(stream, sensor);
                    log::info!("Session with {} ended: {:?}", peer, end);
                }
                Err(err) => log::warn!("Could not accept a client: {}", err),
            }
        }
    }

    fn serve_connection<TSensor: Sensor>(
        &self,
        mut stream: TcpStream,
        sensor: &mut TSensor,
    ) -> SessionEnd {
        match Session::new(sensor, self.thresholds).serve(&mut stream) {
            Ok(end) => end,
            Err(err) => {
                log::warn!("Lost connection to client: {}", err);
                SessionEnd::ConnectionLost
            }
        }
    }
}
