use crate::errors::ConfigError;
use crate::global_variables::ALERT_RADIUS_KM;
use crate::monitoring::geo::haversine_km;
use crate::shared_data::{current_timestamp, Alert, Position, Severity, SignalPost};
use crate::shutdown::Shutdown;
use crate::storage::{AlertLog, PositionStore, SignalPostSource};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::task;

/// Alerts for every driver within the default 1.5 km radius of a post.
pub fn evaluate(positions: &[Position], posts: &[SignalPost]) -> Vec<Alert> {
    evaluate_within(positions, posts, ALERT_RADIUS_KM)
}

/// Checks each driver against the posts in registration order and stops at
/// the first post strictly closer than `radius_km`. The first match wins
/// even when a later post is nearer.
pub fn evaluate_within(positions: &[Position], posts: &[SignalPost], radius_km: f64) -> Vec<Alert> {
    let created_at = current_timestamp();
    let mut alerts = Vec::new();

    for position in positions {
        let hit = posts
            .iter()
            .find(|post| haversine_km(position.coordinates, post.coordinates) < radius_km);
        match hit {
            Some(post) => {
                info!(
                    "Driver {}: high, signal post {}",
                    position.driver_id, post.coordinates
                );
                alerts.push(Alert {
                    driver_id: position.driver_id.clone(),
                    signal_post: *post,
                    severity: Severity::High,
                    created_at,
                });
            }
            None => info!("Driver {} is not close to any signal", position.driver_id),
        }
    }
    alerts
}

/// Outcome of one full evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub alerts: Vec<Alert>,
    /// Alerts that could not be written to the log.
    pub failed_appends: usize,
}

/// Re-evaluates every driver position whenever the position store changes.
pub struct ProximityMonitor {
    positions: Arc<dyn PositionStore>,
    posts: Vec<SignalPost>,
    alerts: Arc<dyn AlertLog>,
    radius_km: f64,
}

impl ProximityMonitor {
    /// Loads the signal posts once; they stay fixed for the monitor's lifetime.
    /// A missing registry is tolerated, an unreadable one is fatal.
    pub fn new(
        positions: Arc<dyn PositionStore>,
        post_source: &dyn SignalPostSource,
        alerts: Arc<dyn AlertLog>,
        radius_km: f64,
    ) -> Result<Self, ConfigError> {
        let loaded = post_source.load().map_err(ConfigError::SignalPosts)?;
        loaded.report("signal post registry");
        for post in &loaded.records {
            debug!("Signal post coordinates: {}", post.coordinates);
        }
        info!("Monitoring {} signal posts", loaded.records.len());

        Ok(Self {
            positions,
            posts: loaded.records,
            alerts,
            radius_km,
        })
    }

    pub fn posts(&self) -> &[SignalPost] {
        &self.posts
    }

    /// One pass over the whole position set. Never fails: store problems are
    /// logged and yield fewer (or zero) alerts.
    pub fn run_pass(&self) -> PassReport {
        let positions = match self.positions.load() {
            Ok(loaded) => {
                loaded.report("position store");
                loaded.records
            }
            Err(e) => {
                error!("Could not read position store: {}", e);
                Vec::new()
            }
        };

        if positions.is_empty() || self.posts.is_empty() {
            info!("No coordinates found to compare");
            return PassReport::default();
        }

        let alerts = evaluate_within(&positions, &self.posts, self.radius_km);
        let mut failed_appends = 0;
        for alert in &alerts {
            if let Err(e) = self.alerts.append(alert) {
                warn!("Could not record alert for {}: {}", alert.driver_id, e);
                failed_appends += 1;
            }
        }
        PassReport {
            alerts,
            failed_appends,
        }
    }

    /// Runs a pass at startup and again after every position change until
    /// shutdown. Changes that land mid-pass trigger one more pass.
    ///
    /// Passes read and write the stores synchronously, so each one runs on
    /// the blocking pool.
    pub async fn run(self: Arc<Self>, mut shutdown: Shutdown) {
        let mut changes = self.positions.subscribe();
        changes.borrow_and_update();
        self.spawn_pass().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Stopped monitoring");
                    break;
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        warn!("Position store closed its change channel");
                        break;
                    }
                    changes.borrow_and_update();
                    info!("Position store updated, re-running proximity check");
                    self.spawn_pass().await;
                }
            }
        }
    }

    async fn spawn_pass(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        if let Err(e) = task::spawn_blocking(move || monitor.run_pass()).await {
            error!("Proximity pass did not complete: {}", e);
        }
    }
}
