use crate::config::Config;
use crate::control_system::countdown::{whole_seconds, Countdown};
use crate::flow_analyzer::{DurationCalculator, LaneCounts, LaneId, VehicleCountProvider, LANE_1, LANE_2};
use crate::global_variables::{EMERGENCY_OVERRIDE_SECS, SAMPLING_WINDOW_SECS, TICK_SECS};
use crate::shared_data::{SignalPhase, SignalState};
use crate::shutdown::Shutdown;
use crate::storage::EmergencyRegistry;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTiming {
    /// How long Signal 1 is held green per emergency trigger.
    pub override_secs: u64,
    pub sampling_window: Duration,
    /// Pause between decision points.
    pub tick: Duration,
}

impl Default for ControllerTiming {
    fn default() -> Self {
        Self {
            override_secs: EMERGENCY_OVERRIDE_SECS,
            sampling_window: Duration::from_secs(SAMPLING_WINDOW_SECS),
            tick: Duration::from_secs(TICK_SECS),
        }
    }
}

/// What the decision point picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    EmergencyOverride,
    NormalCycle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationOutcome {
    Override,
    Normal { signal1_secs: f64, signal2_secs: f64 },
    /// Shutdown arrived before the iteration finished.
    Cancelled,
}

/// Alternates two signals for vehicle-proportional green times, or holds
/// Signal 1 green for a fixed window while any High/Medium declaration exists.
///
/// The controller blocks for the full length of a phase. The registry is
/// only consulted at the top of each iteration, so a declaration written
/// mid-phase takes effect at the next decision point.
pub struct SignalController {
    registry: Arc<dyn EmergencyRegistry>,
    counts: Arc<dyn VehicleCountProvider>,
    calculator: DurationCalculator,
    timing: ControllerTiming,
    countdown: Countdown,
    state: watch::Sender<SignalState>,
}

impl SignalController {
    pub fn new(
        registry: Arc<dyn EmergencyRegistry>,
        counts: Arc<dyn VehicleCountProvider>,
        calculator: DurationCalculator,
        timing: ControllerTiming,
    ) -> Self {
        let (state, _) = watch::channel(SignalState {
            phase: SignalPhase::CyclingSignal1,
            remaining_seconds: 0,
        });
        Self {
            registry,
            counts,
            calculator,
            timing,
            countdown: Countdown::new(false),
            state,
        }
    }

    pub fn from_config(
        config: &Config,
        registry: Arc<dyn EmergencyRegistry>,
        counts: Arc<dyn VehicleCountProvider>,
    ) -> Self {
        let timing = ControllerTiming {
            override_secs: config.override_secs,
            sampling_window: config.sampling_window(),
            tick: config.tick(),
        };
        let calculator = DurationCalculator::new(config.seconds_per_vehicle, config.min_green_secs);
        Self::new(registry, counts, calculator, timing).with_countdown(Countdown::new(config.show_countdown))
    }

    pub fn with_countdown(mut self, countdown: Countdown) -> Self {
        self.countdown = countdown;
        self
    }

    pub fn state(&self) -> SignalState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SignalState> {
        self.state.subscribe()
    }

    /// The per-iteration emergency check. An unreadable registry counts as no
    /// active emergency.
    pub fn decide(&self) -> Decision {
        match self.registry.has_active_emergency() {
            Ok(true) => Decision::EmergencyOverride,
            Ok(false) => Decision::NormalCycle,
            Err(e) => {
                error!("Could not read emergency registry: {}", e);
                Decision::NormalCycle
            }
        }
    }

    // `None` only on shutdown. Provider failures count as an empty lane.
    async fn sample_lane(&self, lane: LaneId, shutdown: &mut Shutdown) -> Option<LaneCounts> {
        let result = tokio::select! {
            _ = shutdown.cancelled() => return None,
            result = self.counts.sample(lane, self.timing.sampling_window) => result,
        };
        match result {
            Ok(counts) => Some(counts),
            Err(e) => {
                warn!("Vehicle count for lane {} unavailable ({}), assuming empty", lane.0, e);
                Some(LaneCounts::default())
            }
        }
    }

    /// Runs one decision point and the phase(s) it selects.
    pub async fn run_iteration(&self, shutdown: &mut Shutdown) -> IterationOutcome {
        if shutdown.is_triggered() {
            return IterationOutcome::Cancelled;
        }

        match self.decide() {
            Decision::EmergencyOverride => {
                info!(
                    "Emergency detected: Signal 1 is GREEN for {} seconds",
                    self.timing.override_secs
                );
                if !self
                    .countdown
                    .run(
                        SignalPhase::EmergencyOverride,
                        self.timing.override_secs,
                        &self.state,
                        shutdown,
                    )
                    .await
                {
                    return IterationOutcome::Cancelled;
                }
                IterationOutcome::Override
            }
            Decision::NormalCycle => {
                // Sequential: lane 2 is sampled after lane 1's window closes.
                let Some(lane1) = self.sample_lane(LANE_1, shutdown).await else {
                    return IterationOutcome::Cancelled;
                };
                let Some(lane2) = self.sample_lane(LANE_2, shutdown).await else {
                    return IterationOutcome::Cancelled;
                };
                let signal1_secs = self.calculator.green_time(lane1.cars, lane1.trucks);
                let signal2_secs = self.calculator.green_time(lane2.cars, lane2.trucks);

                info!("Signal 1 is GREEN for {:.2} seconds", signal1_secs);
                if !self
                    .countdown
                    .run(
                        SignalPhase::CyclingSignal1,
                        whole_seconds(signal1_secs),
                        &self.state,
                        shutdown,
                    )
                    .await
                {
                    return IterationOutcome::Cancelled;
                }

                info!("Signal 1 is now RED. Switching to Signal 2.");
                info!("Signal 2 is GREEN for {:.2} seconds", signal2_secs);
                if !self
                    .countdown
                    .run(
                        SignalPhase::CyclingSignal2,
                        whole_seconds(signal2_secs),
                        &self.state,
                        shutdown,
                    )
                    .await
                {
                    return IterationOutcome::Cancelled;
                }
                info!("Signal 2 is now RED. Switching back to Signal 1.");

                IterationOutcome::Normal {
                    signal1_secs,
                    signal2_secs,
                }
            }
        }
    }

    /// Loops until shutdown, pausing one tick between iterations.
    pub async fn run(&self, mut shutdown: Shutdown) {
        loop {
            if self.run_iteration(&mut shutdown).await == IterationOutcome::Cancelled {
                break;
            }
            if !shutdown.sleep(self.timing.tick).await {
                break;
            }
        }
        info!("Signal controller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SampleError, StoreError};
    use crate::shared_data::{EmergencyDeclaration, Priority};
    use crate::shutdown;
    use crate::storage::{Loaded, MemoryEmergencyRegistry};
    use async_trait::async_trait;
    use tokio::time::Instant;

    /// Fixed counts per lane after waiting out the window; `None` fails the lane.
    struct FixedCounts {
        lane1: Option<LaneCounts>,
        lane2: Option<LaneCounts>,
    }

    #[async_trait]
    impl VehicleCountProvider for FixedCounts {
        async fn sample(&self, lane: LaneId, window: Duration) -> Result<LaneCounts, SampleError> {
            tokio::time::sleep(window).await;
            let counts = if lane == LANE_1 { self.lane1 } else { self.lane2 };
            counts.ok_or(SampleError::NoFeed(lane.0))
        }
    }

    /// Registry whose backing file cannot be read.
    struct UnreadableRegistry;

    impl EmergencyRegistry for UnreadableRegistry {
        fn append(&self, _declaration: EmergencyDeclaration) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        }

        fn load(&self) -> Result<Loaded<EmergencyDeclaration>, StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        }
    }

    fn controller(registry: Arc<MemoryEmergencyRegistry>, counts: FixedCounts) -> SignalController {
        SignalController::new(
            registry,
            Arc::new(counts),
            DurationCalculator::default(),
            ControllerTiming::default(),
        )
    }

    fn busy_lanes() -> FixedCounts {
        FixedCounts {
            lane1: Some(LaneCounts::new(2, 1)),
            lane2: Some(LaneCounts::new(10, 0)),
        }
    }

    fn declare(registry: &MemoryEmergencyRegistry, priority: Priority) {
        registry
            .append(EmergencyDeclaration::new(priority, "D1").unwrap())
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn high_declaration_holds_override_for_sixty_seconds() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        declare(&registry, Priority::High);
        let controller = controller(registry, busy_lanes());
        let (_trigger, mut shutdown) = shutdown::channel();

        let start = Instant::now();
        let outcome = controller.run_iteration(&mut shutdown).await;
        assert_eq!(outcome, IterationOutcome::Override);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert_eq!(controller.state().phase, SignalPhase::EmergencyOverride);
    }

    #[tokio::test(start_paused = true)]
    async fn medium_declaration_also_overrides() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        declare(&registry, Priority::Medium);
        assert_eq!(
            controller(registry, busy_lanes()).decide(),
            Decision::EmergencyOverride
        );
    }

    #[tokio::test(start_paused = true)]
    async fn low_declarations_cycle_normally() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        declare(&registry, Priority::Low);
        let controller = controller(registry, busy_lanes());
        let (_trigger, mut shutdown) = shutdown::channel();

        let start = Instant::now();
        let outcome = controller.run_iteration(&mut shutdown).await;
        assert_eq!(
            outcome,
            IterationOutcome::Normal {
                signal1_secs: 4.5,
                signal2_secs: 15.0
            }
        );
        // Two 5 s samples, 4 s for Signal 1, 15 s for Signal 2.
        assert_eq!(start.elapsed(), Duration::from_secs(29));
        assert_eq!(controller.state().phase, SignalPhase::CyclingSignal2);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_registry_cycles_normally() {
        let controller = SignalController::new(
            Arc::new(UnreadableRegistry),
            Arc::new(busy_lanes()),
            DurationCalculator::default(),
            ControllerTiming::default(),
        );
        assert_eq!(controller.decide(), Decision::NormalCycle);

        let (_trigger, mut shutdown) = shutdown::channel();
        let start = Instant::now();
        assert_eq!(
            controller.run_iteration(&mut shutdown).await,
            IterationOutcome::Normal {
                signal1_secs: 4.5,
                signal2_secs: 15.0
            }
        );
        assert_eq!(start.elapsed(), Duration::from_secs(29));
        assert_eq!(controller.state().phase, SignalPhase::CyclingSignal2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sampling_falls_back_to_minimum() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        let counts = FixedCounts {
            lane1: None,
            lane2: Some(LaneCounts::default()),
        };
        let controller = controller(registry, counts);
        let (_trigger, mut shutdown) = shutdown::channel();

        assert_eq!(
            controller.run_iteration(&mut shutdown).await,
            IterationOutcome::Normal {
                signal1_secs: 5.0,
                signal2_secs: 5.0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn declaration_mid_cycle_applies_at_next_decision_point() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        let controller = Arc::new(controller(registry.clone(), busy_lanes()));
        let mut states = controller.subscribe();
        let (trigger, shutdown) = shutdown::channel();

        let start = Instant::now();
        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.run(shutdown).await })
        };

        // Inside Signal 1's green phase of the first cycle.
        tokio::time::sleep(Duration::from_secs(12)).await;
        declare(&registry, Priority::High);

        states
            .wait_for(|s| s.phase == SignalPhase::EmergencyOverride)
            .await
            .unwrap();
        // 29 s normal cycle plus the 1 s tick.
        assert_eq!(start.elapsed(), Duration::from_secs(30));

        trigger.trigger();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn override_repeats_while_declaration_remains() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        declare(&registry, Priority::High);
        let controller = controller(registry.clone(), busy_lanes());
        let (_trigger, mut shutdown) = shutdown::channel();

        assert_eq!(controller.run_iteration(&mut shutdown).await, IterationOutcome::Override);
        assert_eq!(controller.run_iteration(&mut shutdown).await, IterationOutcome::Override);

        registry.clear();
        assert_eq!(controller.decide(), Decision::NormalCycle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_phase() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        declare(&registry, Priority::High);
        let controller = Arc::new(controller(registry, busy_lanes()));
        let (trigger, shutdown) = shutdown::channel();

        let start = Instant::now();
        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.run(shutdown).await })
        };
        tokio::time::sleep(Duration::from_secs(20)).await;
        trigger.trigger();
        task.await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(21));
        assert!(controller.state().remaining_seconds > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_sampling_cancels() {
        let registry = Arc::new(MemoryEmergencyRegistry::new());
        let controller = Arc::new(controller(registry, busy_lanes()));
        let (trigger, mut shutdown) = shutdown::channel();

        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.run_iteration(&mut shutdown).await })
        };
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.trigger();
        assert_eq!(task.await.unwrap(), IterationOutcome::Cancelled);
    }
}
