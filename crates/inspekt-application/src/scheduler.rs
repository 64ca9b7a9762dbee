//! Background expiry scheduler.
//!
//! Runs a sweep through the lifecycle facade on a fixed period. The task is
//! explicitly owned: started once at process initialization, stopped exactly
//! once at shutdown, so no sweep can touch the store mid-teardown and tests
//! never leak a dangling timer.

use crate::lifecycle::SessionLifecycle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Handle to the background reclamation task.
pub struct ExpiryScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ExpiryScheduler {
    /// Spawns the sweep loop with the period from the lifecycle's
    /// configuration.
    pub fn start(lifecycle: Arc<SessionLifecycle>) -> Self {
        let period = lifecycle.cleanup_interval();
        Self::start_with_period(lifecycle, period)
    }

    /// Spawns the sweep loop with an explicit period.
    ///
    /// A sweep that overruns the period delays later ticks instead of
    /// stacking; ticks missed while sweeping are skipped. Sweep failures are
    /// logged and the loop continues, since the next tick retries the same
    /// work anyway.
    pub fn start_with_period(lifecycle: Arc<SessionLifecycle>, period: Duration) -> Self {
        let (shutdown, mut signal) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval resolves immediately;
            // consume it so the first sweep lands one full period in.
            ticker.tick().await;

            tracing::info!("[ExpiryScheduler] Started ({:?} interval)", period);
            loop {
                tokio::select! {
                    changed = signal.changed() => {
                        if changed.is_err() || *signal.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match lifecycle.sweep().await {
                            Ok(evicted) => {
                                tracing::debug!(
                                    "[ExpiryScheduler] Sweep complete, evicted {}",
                                    evicted
                                );
                            }
                            Err(err) => {
                                tracing::warn!("[ExpiryScheduler] Sweep failed: {}", err);
                            }
                        }
                    }
                }
            }
            tracing::info!("[ExpiryScheduler] Stopped");
        });

        Self { shutdown, handle }
    }

    /// Signals the loop and waits for it to finish.
    ///
    /// No sweep starts after this is called; a sweep already in flight
    /// completes its pass rather than being aborted mid-record.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            tracing::warn!("[ExpiryScheduler] Task ended abnormally: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use inspekt_core::clock::{Clock, ManualClock};
    use inspekt_core::config::LifecycleConfig;
    use std::sync::Arc;

    fn lifecycle_with_clock(clock: Arc<ManualClock>) -> Arc<SessionLifecycle> {
        Arc::new(
            SessionLifecycle::new(LifecycleConfig::default())
                .unwrap()
                .with_clock(clock as Arc<dyn Clock>),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_evicts_expired_sessions_on_tick() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let lifecycle = lifecycle_with_clock(Arc::clone(&clock));

        let record = lifecycle.create("main.py", "python").await.unwrap();
        clock.advance(ChronoDuration::hours(25));
        // Logically dead already, physically still held.
        assert!(lifecycle.get(&record.id).await.unwrap_err().is_not_found());

        let scheduler =
            ExpiryScheduler::start_with_period(Arc::clone(&lifecycle), Duration::from_secs(3600));
        // Let the task set up its ticker before moving time.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(3601)).await;
        // Let the spawned task run its tick.
        tokio::task::yield_now().await;

        assert!(lifecycle.list().await.is_empty());
        assert_eq!(lifecycle.sweep().await.unwrap(), 0);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let lifecycle = lifecycle_with_clock(Arc::clone(&clock));

        let scheduler =
            ExpiryScheduler::start_with_period(Arc::clone(&lifecycle), Duration::from_secs(60));
        scheduler.shutdown().await;

        // A session expiring after shutdown is never swept.
        let record = lifecycle
            .create_with_ttl("main.py", "python", ChronoDuration::seconds(30))
            .await
            .unwrap();
        clock.advance(ChronoDuration::seconds(45));
        tokio::time::advance(Duration::from_secs(300)).await;
        tokio::task::yield_now().await;

        // get() hides it, but it is still physically in the store: only an
        // explicit sweep would evict it now.
        assert!(lifecycle.get(&record.id).await.unwrap_err().is_not_found());
        assert_eq!(lifecycle.sweep().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_uses_the_configured_interval() {
        let config = LifecycleConfig {
            session_cleanup_interval_hours: 2,
            ..Default::default()
        };
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let lifecycle = Arc::new(
            SessionLifecycle::new(config)
                .unwrap()
                .with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
        );

        lifecycle
            .create_with_ttl("main.py", "python", ChronoDuration::minutes(30))
            .await
            .unwrap();
        clock.advance(ChronoDuration::hours(1));

        let scheduler = ExpiryScheduler::start(Arc::clone(&lifecycle));
        tokio::task::yield_now().await;

        // One hour in: not yet ticked (2h interval), record still held.
        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio::task::yield_now().await;
        assert_eq!(lifecycle.list().await.len(), 0); // hidden, not evicted

        tokio::time::advance(Duration::from_secs(3601)).await;
        tokio::task::yield_now().await;
        assert_eq!(lifecycle.sweep().await.unwrap(), 0); // already evicted

        scheduler.shutdown().await;
    }
}
