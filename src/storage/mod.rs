//! Repositories for the shared records.
//!
//! The monitor, the controller and the dispatch operations depend only on
//! these traits. Each store instance serialises its own writes, so one
//! process owns writes to a store (upsert replaces atomically, logs only
//! append) while any number of readers may load it concurrently.

pub mod csv_store;
pub mod memory;

use crate::errors::{RecordError, StoreError};
use crate::shared_data::{Alert, AlertEntry, EmergencyDeclaration, Position, SignalPost};
use log::warn;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

pub use csv_store::{CsvAlertLog, CsvEmergencyRegistry, CsvPositionStore, CsvSignalPosts};
pub use memory::{MemoryAlertLog, MemoryEmergencyRegistry, MemoryPositionStore, MemorySignalPosts};

/// Records read from a store, plus what had to be skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    /// Rejected rows with their 1-based line number.
    pub rejected: Vec<(u64, RecordError)>,
    /// The backing data did not exist; `records` is empty.
    pub missing: bool,
}

impl<T> Loaded<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            rejected: Vec::new(),
            missing: false,
        }
    }

    pub fn missing() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
            missing: true,
        }
    }

    /// Logs the missing-store and malformed-row diagnostics.
    pub fn report(&self, store: &str) {
        if self.missing {
            warn!("{} not found, treating as empty", store);
        }
        for (line, err) in &self.rejected {
            warn!("{} line {}: skipped row ({})", store, line, err);
        }
    }
}

pub trait PositionStore: Send + Sync {
    /// Inserts or replaces the row for `position.driver_id`.
    fn upsert(&self, position: Position) -> Result<(), StoreError>;

    fn load(&self) -> Result<Loaded<Position>, StoreError>;

    /// Version counter bumped on every change.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Signals a change made outside this instance (e.g. another process).
    fn notify_changed(&self);
}

pub trait SignalPostSource: Send + Sync {
    fn load(&self) -> Result<Loaded<SignalPost>, StoreError>;
}

pub trait EmergencyRegistry: Send + Sync {
    fn append(&self, declaration: EmergencyDeclaration) -> Result<(), StoreError>;

    fn load(&self) -> Result<Loaded<EmergencyDeclaration>, StoreError>;

    /// Any High or Medium declaration. Declarations never expire.
    fn has_active_emergency(&self) -> Result<bool, StoreError> {
        let loaded = self.load()?;
        loaded.report("emergency registry");
        Ok(loaded.records.iter().any(|d| d.priority.is_active()))
    }

    /// A driver is registered once any declaration names them.
    fn is_registered(&self, driver_id: &str) -> Result<bool, StoreError> {
        let driver_id = driver_id.trim();
        Ok(self
            .load()?
            .records
            .iter()
            .any(|d| d.driver_id == driver_id))
    }
}

/// Append-only; repeated alerts for the same post are kept.
pub trait AlertLog: Send + Sync {
    fn append(&self, alert: &Alert) -> Result<(), StoreError>;

    fn entries(&self) -> Result<Vec<AlertEntry>, StoreError>;
}

/// Shared change channel for position stores.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn bump(&self) {
        self.tx.send_modify(|version| *version = version.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned lock only means another writer panicked; the data is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
