pub mod countdown;
pub mod signal_controller;

pub use countdown::{whole_seconds, Countdown};
pub use signal_controller::{ControllerTiming, Decision, IterationOutcome, SignalController};
