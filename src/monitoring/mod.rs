// monitoring/mod.rs
pub mod change_poller;
pub mod geo;
pub mod proximity_monitor;

pub use change_poller::watch_file;
pub use geo::haversine_km;
pub use proximity_monitor::{evaluate, evaluate_within, PassReport, ProximityMonitor};
