// Default store locations (relative to the working directory).
pub const POSITIONS_FILE: &str = "coordinates.csv";
pub const SIGNAL_POSTS_FILE: &str = "signal_coor.csv";
pub const EMERGENCY_FILE: &str = "emergency.csv";
pub const ALERTS_FILE: &str = "output.csv";

// Proximity
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const ALERT_RADIUS_KM: f64 = 1.5;

// Green time
pub const SECONDS_PER_VEHICLE: f64 = 1.5;
pub const MIN_GREEN_SECS: f64 = 5.0;

// Controller timing (seconds)
pub const EMERGENCY_OVERRIDE_SECS: u64 = 60;
pub const SAMPLING_WINDOW_SECS: u64 = 5;
pub const TICK_SECS: u64 = 1;

// Position file poll interval for out-of-process writers.
pub const POLL_INTERVAL_MS: u64 = 500;

// Recorded lane feeds are assumed to be sampled at this rate.
pub const FEED_FRAMES_PER_SECOND: u64 = 30;
