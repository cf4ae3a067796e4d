use crate::shutdown::Shutdown;
use crate::storage::PositionStore;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.and_then(|m| m.modified()).ok()
}

/// Polls `path`'s modification time and notifies `store` when it changes, so
/// writes from other processes re-trigger the proximity monitor.
pub async fn watch_file(
    path: PathBuf,
    store: Arc<dyn PositionStore>,
    interval: Duration,
    mut shutdown: Shutdown,
) {
    let mut last_seen = modified_at(&path).await;
    debug!("Watching {} for changes", path.display());

    while shutdown.sleep(interval).await {
        let current = modified_at(&path).await;
        if current != last_seen {
            info!("{} updated", path.display());
            last_seen = current;
            store.notify_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;
    use crate::storage::MemoryPositionStore;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn notifies_when_file_appears() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates.csv");
        let store = Arc::new(MemoryPositionStore::new());
        let mut changes = store.subscribe();
        let (trigger, shutdown) = shutdown::channel();

        let poller = tokio::spawn(watch_file(
            path.clone(),
            store.clone(),
            Duration::from_millis(10),
            shutdown,
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        fs::write(&path, "D1,\"(1.0, 1.0)\"\n").unwrap();

        tokio::time::timeout(Duration::from_secs(5), changes.changed())
            .await
            .unwrap()
            .unwrap();

        trigger.trigger();
        poller.await.unwrap();
    }
}
