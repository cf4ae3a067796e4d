use clap::Parser;
use log::{error, info};
use signal_preempt::config::Config;
use signal_preempt::control_system::SignalController;
use signal_preempt::errors::ConfigError;
use signal_preempt::flow_analyzer::{
    LaneId, ReplayCountProvider, SimulatedCountProvider, VehicleCountProvider,
};
use signal_preempt::shutdown;
use signal_preempt::storage::CsvEmergencyRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Cycles two signals by vehicle density, yielding to emergency declarations.
#[derive(Debug, Parser)]
struct Args {
    /// JSON config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn count_provider(config: &Config) -> Arc<dyn VehicleCountProvider> {
    let feeds: Vec<(LaneId, PathBuf)> = config
        .lane_feeds
        .iter()
        .enumerate()
        .filter_map(|(i, feed)| feed.clone().map(|path| (LaneId(i as u8 + 1), path)))
        .collect();

    if feeds.is_empty() {
        info!("No lane feeds configured, using simulated vehicle counts");
        Arc::new(SimulatedCountProvider::default())
    } else {
        Arc::new(ReplayCountProvider::new(feeds))
    }
}

async fn run(args: Args) -> Result<(), ConfigError> {
    let config = Config::load(args.config.as_deref())?;
    let controller = SignalController::from_config(
        &config,
        Arc::new(CsvEmergencyRegistry::new(&config.emergency_path)),
        count_provider(&config),
    );

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.trigger();
        }
    });

    controller.run(shutdown).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("Starting signal controller...");
    if let Err(e) = run(Args::parse()).await {
        error!("{}", e);
        eprintln!("Controller error: {}", e);
        std::process::exit(1);
    }
}
