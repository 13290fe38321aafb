use clap::{Parser, ValueEnum};

use crate::session::{Thresholds, DEFAULT_HUMIDITY_THRESHOLD, DEFAULT_TEMPERATURE_THRESHOLD};

pub const DEFAULT_PORT: u16 = 12345;
/// BCM numbering.
pub const DEFAULT_PIN: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// A virtual sensor reporting fixed conditions.
    Simulated,
    /// Raspberry Pi GPIO. Requires the `rpi` feature.
    Rpi,
}

/// Serves DHT22 readings and threshold alerts to a single TCP client.
#[derive(Clone, Debug, Parser)]
#[command(name = "dht-monitor", version, about)]
pub struct Config {
    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// GPIO line the sensor's data pin is wired to.
    #[arg(long, default_value_t = DEFAULT_PIN)]
    pub pin: u8,

    #[arg(long, value_enum, default_value_t = BackendKind::Simulated)]
    pub backend: BackendKind,

    /// Alert when the temperature, in degrees Celsius, is above this.
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE_THRESHOLD)]
    pub temperature_threshold: f32,

    /// Alert when the relative humidity, in percent, is above this.
    #[arg(long, default_value_t = DEFAULT_HUMIDITY_THRESHOLD)]
    pub humidity_threshold: f32,

    /// Temperature reported by the simulated backend.
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    pub simulated_temperature: f32,

    /// Humidity reported by the simulated backend.
    #[arg(long, default_value_t = 40.0)]
    pub simulated_humidity: f32,

    /// Keep accepting clients after the first session ends.
    #[arg(long)]
    pub keep_serving: bool,
}

impl Config {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            temperature: self.temperature_threshold,
            humidity: self.humidity_threshold,
        }
    }
}
