use crate::global_variables::{MIN_GREEN_SECS, SECONDS_PER_VEHICLE};

/// Green time for one lane at the default rate (1.5 s per vehicle, 5 s floor
/// for an empty lane).
pub fn green_time(car_count: u32, truck_count: u32) -> f64 {
    DurationCalculator::default().green_time(car_count, truck_count)
}

/// Converts a lane's sampled vehicle counts into seconds of green.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationCalculator {
    pub seconds_per_vehicle: f64,
    /// Used only when the lane is empty.
    pub min_green_secs: f64,
}

impl Default for DurationCalculator {
    fn default() -> Self {
        Self {
            seconds_per_vehicle: SECONDS_PER_VEHICLE,
            min_green_secs: MIN_GREEN_SECS,
        }
    }
}

impl DurationCalculator {
    pub fn new(seconds_per_vehicle: f64, min_green_secs: f64) -> Self {
        Self {
            seconds_per_vehicle,
            min_green_secs,
        }
    }

    pub fn green_time(&self, car_count: u32, truck_count: u32) -> f64 {
        let combined = u64::from(car_count) + u64::from(truck_count);
        if combined > 0 {
            self.seconds_per_vehicle * combined as f64
        } else {
            self.min_green_secs
        }
    }
}
