//! Cooperative shutdown shared by the monitor and controller loops.

use std::time::Duration;
use tokio::sync::watch;

/// Fires every [`Shutdown`] cloned from the same channel.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered. Never resolves if the trigger is
    /// dropped without firing.
    pub async fn cancelled(&mut self) {
        let fired = self.rx.wait_for(|triggered| *triggered).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }

    /// Sleeps for `duration`. Returns `false` if shutdown interrupted the sleep.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }
        tokio::select! {
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
