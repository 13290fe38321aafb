use std::process::ExitCode;

use clap::Parser;
use dht_monitor::config::{BackendKind, Config};
use dht_monitor::dht22::Dht22;
use dht_monitor::error::SetupError;
use dht_monitor::hardware::simulated::SimulatedBackend;
use dht_monitor::hardware::{Backend, HardwareScope, SpinDelay};
use dht_monitor::session::Server;

fn main() -> ExitCode {
    let config = Config::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), SetupError> {
    match config.backend {
        BackendKind::Simulated => serve(
            SimulatedBackend::new(config.simulated_temperature, config.simulated_humidity),
            config,
        ),
        #[cfg(feature = "rpi")]
        BackendKind::Rpi => serve(dht_monitor::hardware::rpi::RpiBackend::new(), config),
        #[cfg(not(feature = "rpi"))]
        BackendKind::Rpi => Err(dht_monitor::error::HardwareError::Unavailable("rpi").into()),
    }
}

/// Owns the hardware for the lifetime of the server. Everything opened here is dropped before
/// the hardware scope, whichever way this returns.
fn serve<B: Backend>(backend: B, config: &Config) -> Result<(), SetupError> {
    let mut hardware = HardwareScope::acquire(backend)?;
    let line = hardware.open_line(config.pin)?;
    let mut sensor = Dht22::new(line, SpinDelay::new());

    let server = Server::bind((config.bind.as_str(), config.port), config.thresholds())?;
    log::info!("Waiting for a client on {}:{}", config.bind, config.port);

    if config.keep_serving {
        server.serve_forever(&mut sensor);
    }
    let end = server.serve_one(&mut sensor)?;
    log::info!("Session closed: {:?}", end);
    Ok(())
}
