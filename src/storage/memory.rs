use super::{lock, AlertLog, ChangeNotifier, EmergencyRegistry, Loaded, PositionStore, SignalPostSource};
use crate::errors::StoreError;
use crate::shared_data::{Alert, AlertEntry, EmergencyDeclaration, Position, SignalPost};
use std::sync::Mutex;
use tokio::sync::watch;

#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    rows: Mutex<Vec<Position>>,
    notifier: ChangeNotifier,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PositionStore for MemoryPositionStore {
    fn upsert(&self, position: Position) -> Result<(), StoreError> {
        {
            let mut rows = lock(&self.rows);
            match rows.iter_mut().find(|p| p.driver_id == position.driver_id) {
                Some(existing) => *existing = position,
                None => rows.push(position),
            }
        }
        self.notifier.bump();
        Ok(())
    }

    fn load(&self) -> Result<Loaded<Position>, StoreError> {
        Ok(Loaded::new(lock(&self.rows).clone()))
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    fn notify_changed(&self) {
        self.notifier.bump();
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySignalPosts {
    posts: Vec<SignalPost>,
}

impl MemorySignalPosts {
    pub fn new(posts: Vec<SignalPost>) -> Self {
        Self { posts }
    }
}

impl SignalPostSource for MemorySignalPosts {
    fn load(&self) -> Result<Loaded<SignalPost>, StoreError> {
        Ok(Loaded::new(self.posts.clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryEmergencyRegistry {
    rows: Mutex<Vec<EmergencyDeclaration>>,
}

impl MemoryEmergencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every declaration, as an operator clearing the log would.
    pub fn clear(&self) {
        lock(&self.rows).clear();
    }
}

impl EmergencyRegistry for MemoryEmergencyRegistry {
    fn append(&self, declaration: EmergencyDeclaration) -> Result<(), StoreError> {
        lock(&self.rows).push(declaration);
        Ok(())
    }

    fn load(&self) -> Result<Loaded<EmergencyDeclaration>, StoreError> {
        Ok(Loaded::new(lock(&self.rows).clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryAlertLog {
    rows: Mutex<Vec<AlertEntry>>,
}

impl MemoryAlertLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertLog for MemoryAlertLog {
    fn append(&self, alert: &Alert) -> Result<(), StoreError> {
        lock(&self.rows).push(AlertEntry::from(alert));
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AlertEntry>, StoreError> {
        Ok(lock(&self.rows).clone())
    }
}
