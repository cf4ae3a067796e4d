use crate::shared_data::{SignalPhase, SignalState};
use crate::shutdown::Shutdown;
use std::io::{stdout, Write};
use std::time::Duration;
use tokio::sync::watch;

const TICK: Duration = Duration::from_secs(1);

/// One-second ticker that publishes the remaining time of a phase and can be
/// abandoned on shutdown.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    /// Print "Time left" to the console.
    pub show: bool,
}

impl Countdown {
    pub fn new(show: bool) -> Self {
        Self { show }
    }

    /// Counts `secs` down to zero. Returns `false` if shutdown cut it short.
    pub async fn run(
        &self,
        phase: SignalPhase,
        secs: u64,
        state: &watch::Sender<SignalState>,
        shutdown: &mut Shutdown,
    ) -> bool {
        for remaining in (1..=secs).rev() {
            state.send_replace(SignalState {
                phase,
                remaining_seconds: remaining,
            });
            if self.show {
                print!("\rTime left: {} seconds ", remaining);
                let _ = stdout().flush();
            }
            if !shutdown.sleep(TICK).await {
                if self.show {
                    println!();
                }
                return false;
            }
        }
        state.send_replace(SignalState {
            phase,
            remaining_seconds: 0,
        });
        if self.show {
            println!();
        }
        true
    }
}

/// Countdown length for a computed green time: the whole seconds of it.
pub fn whole_seconds(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;
    use tokio::time::Instant;

    fn idle_state() -> SignalState {
        SignalState {
            phase: SignalPhase::CyclingSignal1,
            remaining_seconds: 0,
        }
    }

    #[test]
    fn whole_seconds_truncates() {
        assert_eq!(whole_seconds(4.5), 4);
        assert_eq!(whole_seconds(15.0), 15);
        assert_eq!(whole_seconds(-1.0), 0);
        assert_eq!(whole_seconds(f64::NAN), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_in_one_second_ticks() {
        let (_trigger, mut shutdown) = shutdown::channel();
        let (tx, rx) = watch::channel(idle_state());
        let start = Instant::now();

        assert!(
            Countdown::new(false)
                .run(SignalPhase::CyclingSignal2, 3, &tx, &mut shutdown)
                .await
        );
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(
            *rx.borrow(),
            SignalState {
                phase: SignalPhase::CyclingSignal2,
                remaining_seconds: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_countdown() {
        let (trigger, mut shutdown) = shutdown::channel();
        let (tx, rx) = watch::channel(idle_state());

        let handle = tokio::spawn(async move {
            Countdown::new(false)
                .run(SignalPhase::EmergencyOverride, 60, &tx, &mut shutdown)
                .await
        });
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        trigger.trigger();

        assert!(!handle.await.unwrap());
        assert_eq!(rx.borrow().phase, SignalPhase::EmergencyOverride);
        assert_eq!(rx.borrow().remaining_seconds, 50);
    }
}
