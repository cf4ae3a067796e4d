use clap::{Parser, Subcommand};
use signal_preempt::config::Config;
use signal_preempt::dispatch::Dispatch;
use signal_preempt::shared_data::Priority;
use signal_preempt::storage::{AlertLog, CsvAlertLog, CsvEmergencyRegistry, CsvPositionStore};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// Writes driver registrations, emergency declarations and positions.
#[derive(Debug, Parser)]
struct Args {
    /// JSON config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a driver (Low priority).
    Subscribe { driver_id: String },
    /// Declare an emergency: High, Medium or Low.
    Declare { priority: Priority, driver_id: String },
    /// Record a driver's current position.
    UpdatePosition {
        driver_id: String,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
        /// Reject drivers with no declaration on file.
        #[arg(long)]
        require_registered: bool,
    },
    /// Print the alert log.
    Alerts,
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(args.config.as_deref())?;
    let dispatch = Dispatch::new(
        Arc::new(CsvPositionStore::new(&config.positions_path)),
        Arc::new(CsvEmergencyRegistry::new(&config.emergency_path)),
    );

    match args.command {
        Command::Subscribe { driver_id } => {
            dispatch.subscribe_driver(&driver_id)?;
            println!("Driver {} subscribed successfully!", driver_id);
        }
        Command::Declare {
            priority,
            driver_id,
        } => {
            dispatch.declare_emergency(priority, &driver_id)?;
            println!("{} priority recorded for driver {}", priority, driver_id);
        }
        Command::UpdatePosition {
            driver_id,
            latitude,
            longitude,
            require_registered,
        } => {
            if require_registered {
                dispatch.report_position(&driver_id, latitude, longitude)?;
            } else {
                dispatch.update_position(&driver_id, latitude, longitude)?;
            }
            println!(
                "Updating coordinates for {}: ({}, {})",
                driver_id, latitude, longitude
            );
        }
        Command::Alerts => {
            let entries = CsvAlertLog::new(&config.alerts_path).entries()?;
            println!("Alerts:");
            for entry in &entries {
                println!("{} {}", entry.signal_post.coordinates, entry.severity.as_str());
            }
            println!("Total alerts: {}", entries.len());
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Args::parse()) {
        eprintln!("Dispatch error: {}", e);
        std::process::exit(1);
    }
}
