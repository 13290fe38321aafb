#![cfg_attr(not(feature = "std"), no_std)]

/// Driver for reading DHT22 sensors over a bit-banged single-wire line.
pub mod dht22;
/// The GPIO capability the driver needs.
pub mod line;

/// Command-line configuration of the server.
#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod error;
/// Hardware backends and their process-wide setup.
#[cfg(feature = "std")]
pub mod hardware;
/// The text protocol served to TCP clients.
#[cfg(feature = "std")]
pub mod session;
