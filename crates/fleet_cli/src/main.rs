//! CLI entry point for the fleet simulator.

mod sink;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fleet_core::emitter::event_channels;
use fleet_core::routing::RouteStore;
use fleet_core::runner::FleetRuntime;
use fleet_core::scenario::SimulationParams;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fleet-sim")]
#[command(about = "Car-sharing fleet simulator streaming status, trip and booking events as JSON lines")]
#[command(version)]
struct Cli {
    /// Routing-engine JSON file with the routes vehicles drive
    #[arg(long, env = "FLEET_ROUTES")]
    routes: PathBuf,

    /// JSON file with simulation parameters; missing fields use defaults
    #[arg(long, env = "FLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Number of vehicles (overrides the config file)
    #[arg(long, env = "FLEET_VEHICLES")]
    vehicles: Option<usize>,

    /// Number of riders (overrides the config file)
    #[arg(long, env = "FLEET_RIDERS")]
    riders: Option<usize>,

    /// Seed for the initial fleet and per-task RNGs
    #[arg(long, env = "FLEET_SEED")]
    seed: Option<u64>,

    /// Stop after this many seconds; runs until Ctrl-C when omitted
    #[arg(long, env = "FLEET_DURATION_SECS")]
    duration_secs: Option<u64>,
}

impl Cli {
    fn params(&self) -> Result<SimulationParams> {
        let mut params = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                SimulationParams::from_json(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SimulationParams::default(),
        };
        if let Some(vehicles) = self.vehicles {
            params.fleet.vehicles = vehicles;
        }
        if let Some(riders) = self.riders {
            params.fleet.riders = riders;
        }
        if let Some(seed) = self.seed {
            params.seed = Some(seed);
        }
        params.validate().context("invalid simulation parameters")?;
        Ok(params)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the event stream, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let params = cli.params()?;
    let routes = RouteStore::load(&cli.routes)
        .with_context(|| format!("loading routes from {}", cli.routes.display()))?;

    let (emitter, mut bus) = event_channels(params.emitter.channel_capacity);
    let sink = sink::spawn_stdout_sink(bus.subscribe());
    let runtime = FleetRuntime::start(&params, Arc::new(routes), emitter, bus)?;

    wait_for_stop(cli.duration_secs.map(Duration::from_secs)).await?;

    let report = runtime.shutdown().await;
    let written = sink.await.context("stdout sink task")??;
    info!(
        vehicles = report.vehicles.len(),
        controller = ?report.controller,
        events = written,
        "simulation finished"
    );
    Ok(())
}

async fn wait_for_stop(run_for: Option<Duration>) -> Result<()> {
    let elapsed = async {
        match run_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            info!("Ctrl-C received, shutting down");
        }
        _ = elapsed => info!(?run_for, "run duration elapsed, shutting down"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_config_file() {
        let mut config = tempfile::NamedTempFile::new().expect("temp file");
        write!(config, r#"{{"fleet": {{"vehicles": 3, "riders": 4}}, "booking": {{"ttl_secs": 60}}}}"#)
            .expect("write config");
        let path = config.path().to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "fleet-sim",
            "--routes",
            "routes.json",
            "--config",
            path.as_str(),
            "--riders",
            "9",
            "--seed",
            "5",
        ])
        .expect("valid args");
        let params = cli.params().expect("params");
        assert_eq!(params.fleet.vehicles, 3);
        assert_eq!(params.fleet.riders, 9);
        assert_eq!(params.booking.ttl_secs, 60);
        assert_eq!(params.seed, Some(5));
    }

    #[test]
    fn defaults_without_config() {
        let cli = Cli::try_parse_from(["fleet-sim", "--routes", "r.json", "--vehicles", "2"])
            .expect("valid args");
        let params = cli.params().expect("params");
        assert_eq!(params.fleet.vehicles, 2);
        assert_eq!(params.fleet.riders, SimulationParams::default().fleet.riders);
        assert!(cli.duration_secs.is_none());
    }

    #[test]
    fn routes_flag_is_required() {
        assert!(Cli::try_parse_from(["fleet-sim"]).is_err());
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut config = tempfile::NamedTempFile::new().expect("temp file");
        write!(config, r#"{{"vehicle": {{"tick_ms": 0}}}}"#).expect("write config");
        let path = config.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["fleet-sim", "--routes", "r.json", "--config", path.as_str()])
            .expect("valid args");
        let err = cli.params().expect_err("tick_ms 0 is invalid");
        assert!(format!("{err:#}").contains("tick_ms"));
    }
}
