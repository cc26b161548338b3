use std::path::PathBuf;

use clap::Parser;
use rover_can_drive::config::RoverConfig;
use rover_can_drive::motor::TransportMode;
use tracing_subscriber::EnvFilter;

/// Drive the rover forward from the keyboard: W = go, B = brake and stop, Q = quit
#[derive(Debug, Parser)]
#[command(name = "rover-control", version)]
struct Cli {
    /// JSON config file (defaults to the stock wiring when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CAN interface, eg. can0 or vcan0
    #[arg(short, long)]
    interface: Option<String>,

    /// Log CAN frames instead of writing them to the bus
    #[arg(long)]
    dry_run: bool,

    /// Largest accepted speed in m/s
    #[arg(long)]
    speed_limit: Option<f32>,

    /// Speed used when driving forward, m/s
    #[arg(long)]
    cruise_speed: Option<f32>,

    /// Distance after which the rover stops on its own, m
    #[arg(long)]
    target_distance: Option<f32>,

    /// Accept drive commands and publish status over zenoh
    #[arg(long)]
    remote: bool,
}

impl Cli {
    /// Config file (or defaults) with command line overrides applied
    fn into_config(self) -> Result<RoverConfig, rover_can_drive::config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => RoverConfig::load(path)?,
            None => RoverConfig::default(),
        };
        if let Some(interface) = self.interface {
            config.interface = interface;
        }
        if self.dry_run {
            config.transport = TransportMode::DryRun;
        }
        if let Some(limit) = self.speed_limit {
            config.speed_limit_mps = limit;
        }
        if let Some(speed) = self.cruise_speed {
            config.cruise_speed_mps = speed;
        }
        if let Some(distance) = self.target_distance {
            config.target_distance_m = distance;
        }
        config.remote |= self.remote;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rover_can_drive::runtime::run(&config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
