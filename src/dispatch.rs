//! Operations used by the dispatch and driver front-ends.
//!
//! All input is validated here, so the stores only ever see well-formed
//! records.

use crate::errors::DispatchError;
use crate::shared_data::{EmergencyDeclaration, Position, Priority};
use crate::storage::{EmergencyRegistry, PositionStore};
use log::info;
use std::sync::Arc;

pub struct Dispatch {
    positions: Arc<dyn PositionStore>,
    registry: Arc<dyn EmergencyRegistry>,
}

impl Dispatch {
    pub fn new(positions: Arc<dyn PositionStore>, registry: Arc<dyn EmergencyRegistry>) -> Self {
        Self {
            positions,
            registry,
        }
    }

    /// Registers a driver with a `Low` declaration, which never triggers an override.
    pub fn subscribe_driver(&self, driver_id: &str) -> Result<(), DispatchError> {
        self.declare_emergency(Priority::Low, driver_id)
    }

    pub fn declare_emergency(&self, priority: Priority, driver_id: &str) -> Result<(), DispatchError> {
        let declaration = EmergencyDeclaration::new(priority, driver_id)?;
        info!(
            "Declared {} priority for driver {}",
            declaration.priority, declaration.driver_id
        );
        self.registry.append(declaration)?;
        Ok(())
    }

    pub fn update_position(&self, driver_id: &str, latitude: f64, longitude: f64) -> Result<(), DispatchError> {
        let position = Position::new(driver_id, latitude, longitude)?;
        self.positions.upsert(position)?;
        Ok(())
    }

    /// Like [`Dispatch::update_position`], but only for drivers that have been
    /// subscribed or declared.
    pub fn report_position(&self, driver_id: &str, latitude: f64, longitude: f64) -> Result<(), DispatchError> {
        if !self.registry.is_registered(driver_id)? {
            return Err(DispatchError::UnknownDriver(driver_id.trim().to_string()));
        }
        self.update_position(driver_id, latitude, longitude)
    }
}
