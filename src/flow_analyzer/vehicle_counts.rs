//! Vehicle counting collaborators.
//!
//! Detection itself happens outside this crate. A provider hands back one
//! car/truck count per lane for a sampling window; the controller never
//! looks at frames.

use crate::errors::SampleError;
use crate::global_variables::FEED_FRAMES_PER_SECOND;
use async_trait::async_trait;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaneId(pub u8);

pub const LANE_1: LaneId = LaneId(1);
pub const LANE_2: LaneId = LaneId(2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneCounts {
    pub cars: u32,
    pub trucks: u32,
}

impl LaneCounts {
    pub fn new(cars: u32, trucks: u32) -> Self {
        Self { cars, trucks }
    }

    pub fn combined(&self) -> u64 {
        u64::from(self.cars) + u64::from(self.trucks)
    }

    /// Per-frame average over a window, rounded down. No frames yields zero.
    pub fn average(frames: &[LaneCounts]) -> LaneCounts {
        if frames.is_empty() {
            return LaneCounts::default();
        }
        let n = frames.len() as u64;
        let cars: u64 = frames.iter().map(|f| u64::from(f.cars)).sum();
        let trucks: u64 = frames.iter().map(|f| u64::from(f.trucks)).sum();
        LaneCounts {
            cars: (cars / n) as u32,
            trucks: (trucks / n) as u32,
        }
    }
}

#[async_trait]
pub trait VehicleCountProvider: Send + Sync {
    /// Samples `lane` for `window` and returns the vehicle counts seen.
    async fn sample(&self, lane: LaneId, window: Duration) -> Result<LaneCounts, SampleError>;
}

/// Replays recorded per-frame detections (`car_count,truck_count` rows, no
/// header), one file per lane.
#[derive(Debug, Clone)]
pub struct ReplayCountProvider {
    feeds: Vec<(LaneId, PathBuf)>,
    frames_per_second: u64,
}

impl ReplayCountProvider {
    pub fn new(feeds: Vec<(LaneId, PathBuf)>) -> Self {
        Self {
            feeds,
            frames_per_second: FEED_FRAMES_PER_SECOND,
        }
    }

    pub fn with_frames_per_second(mut self, frames_per_second: u64) -> Self {
        self.frames_per_second = frames_per_second;
        self
    }

    fn read_feed(lane: LaneId, path: PathBuf, max_frames: usize) -> Result<LaneCounts, SampleError> {
        let file = File::open(&path).map_err(|source| SampleError::FeedUnavailable {
            lane: lane.0,
            source,
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(file);

        let frames = rdr
            .deserialize::<LaneCounts>()
            .take(max_frames)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| SampleError::FeedUnreadable {
                lane: lane.0,
                source,
            })?;
        debug!("Lane {}: {} frames from {}", lane.0, frames.len(), path.display());
        Ok(LaneCounts::average(&frames))
    }
}

#[async_trait]
impl VehicleCountProvider for ReplayCountProvider {
    async fn sample(&self, lane: LaneId, window: Duration) -> Result<LaneCounts, SampleError> {
        let path = self
            .feeds
            .iter()
            .find(|(id, _)| *id == lane)
            .map(|(_, path)| path.clone())
            .ok_or(SampleError::NoFeed(lane.0))?;
        let max_frames = (window.as_secs().max(1) * self.frames_per_second) as usize;

        // The recording stands in for a live feed, so the window still elapses.
        let read = task::spawn_blocking(move || Self::read_feed(lane, path, max_frames));
        let (result, ()) = tokio::join!(read, tokio::time::sleep(window));
        result.map_err(|e| SampleError::FeedUnavailable {
            lane: lane.0,
            source: std::io::Error::other(e),
        })?
    }
}

/// Waits out the window and reports random counts. For running without feeds.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedCountProvider {
    pub max_per_class: u32,
}

impl Default for SimulatedCountProvider {
    fn default() -> Self {
        Self { max_per_class: 10 }
    }
}

#[async_trait]
impl VehicleCountProvider for SimulatedCountProvider {
    async fn sample(&self, lane: LaneId, window: Duration) -> Result<LaneCounts, SampleError> {
        tokio::time::sleep(window).await;
        let counts = {
            let mut rng = rand::rng();
            LaneCounts {
                cars: rng.random_range(0..=self.max_per_class),
                trucks: rng.random_range(0..=self.max_per_class / 2),
            }
        };
        debug!("Lane {} simulated counts: {:?}", lane.0, counts);
        Ok(counts)
    }
}
