use clap::Parser;
use log::error;
use signal_preempt::config::Config;
use signal_preempt::errors::ConfigError;
use signal_preempt::monitoring::{watch_file, ProximityMonitor};
use signal_preempt::shutdown;
use signal_preempt::storage::{CsvAlertLog, CsvPositionStore, CsvSignalPosts, PositionStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Raises an alert whenever a tracked driver comes within range of a signal post.
#[derive(Debug, Parser)]
struct Args {
    /// JSON config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

async fn run(args: Args) -> Result<(), ConfigError> {
    let config = Config::load(args.config.as_deref())?;

    let positions: Arc<dyn PositionStore> = Arc::new(CsvPositionStore::new(&config.positions_path));
    let monitor = Arc::new(ProximityMonitor::new(
        positions.clone(),
        &CsvSignalPosts::new(&config.signal_posts_path),
        Arc::new(CsvAlertLog::new(&config.alerts_path)),
        config.alert_radius_km,
    )?);

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.trigger();
        }
    });
    let poller = tokio::spawn(watch_file(
        config.positions_path.clone(),
        positions,
        config.poll_interval(),
        shutdown.clone(),
    ));

    println!(
        "Monitoring {} for changes...",
        config.positions_path.display()
    );
    monitor.run(shutdown).await;
    let _ = poller.await;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run(Args::parse()).await {
        error!("{}", e);
        eprintln!("Monitor error: {}", e);
        std::process::exit(1);
    }
}
