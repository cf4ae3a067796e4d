pub mod duration_calculator;
pub mod vehicle_counts;

pub use duration_calculator::{green_time, DurationCalculator};
pub use vehicle_counts::{
    LaneCounts, LaneId, ReplayCountProvider, SimulatedCountProvider, VehicleCountProvider, LANE_1,
    LANE_2,
};
