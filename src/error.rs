use std::io;

use thiserror::Error;

/// Failures that stop the server before or while waiting for a client.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("hardware initialisation failed: {0}")]
    Hardware(#[from] HardwareError),
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("could not accept a client: {0}")]
    Accept(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum HardwareError {
    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    #[error("the {0} backend was used before it was initialised")]
    NotInitialised(&'static str),
    #[error("the {0} backend is not available in this build")]
    Unavailable(&'static str),
}
