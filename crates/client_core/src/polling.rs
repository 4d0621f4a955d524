//! Periodic combined refresh of the stats panel and the review feed.
//!
//! Each tick's refresh work runs in its own task. `stop()` only aborts the
//! timer task, so fetches already dispatched still complete and apply. A tick
//! that fires while the previous one is still in flight is skipped.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info};

use crate::{feed::ReviewFeedStore, sequence::RefreshOutcome, stats::StatsAggregatorView};

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, period: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub stats: RefreshOutcome,
    pub reviews: RefreshOutcome,
}

/// Both fetches are dispatched together; neither result gates the other.
pub async fn combined_refresh(stats: &StatsAggregatorView, feed: &ReviewFeedStore) -> TickOutcome {
    let (stats, reviews) = futures::join!(stats.refresh(), feed.refresh());
    TickOutcome { stats, reviews }
}

struct TickGuard(Arc<AtomicBool>);

impl TickGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct Targets {
    stats: Arc<StatsAggregatorView>,
    feed: Arc<ReviewFeedStore>,
    tick_in_flight: Arc<AtomicBool>,
}

impl Targets {
    fn dispatch_tick(&self) -> Option<JoinHandle<TickOutcome>> {
        let Some(guard) = TickGuard::acquire(&self.tick_in_flight) else {
            debug!("previous poll tick still in flight; skipping");
            return None;
        };
        let targets = self.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            let outcome = combined_refresh(&targets.stats, &targets.feed).await;
            debug!(stats = ?outcome.stats, reviews = ?outcome.reviews, "poll tick complete");
            outcome
        }))
    }
}

struct ActivePoll {
    interval: Duration,
    timer_task: JoinHandle<()>,
}

pub struct PollingCoordinator {
    targets: Targets,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<ActivePoll>>,
}

impl PollingCoordinator {
    pub fn new(
        stats: Arc<StatsAggregatorView>,
        feed: Arc<ReviewFeedStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            targets: Targets {
                stats,
                feed,
                tick_in_flight: Arc::new(AtomicBool::new(false)),
            },
            clock,
            active: Mutex::new(None),
        }
    }

    /// Refreshes immediately, then every `interval`. Restarts if already running.
    pub async fn start(&self, interval: Duration) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            info!(previous_ms = previous.interval.as_millis() as u64, "restarting poller");
            previous.timer_task.abort();
        }

        let targets = self.targets.clone();
        let clock = Arc::clone(&self.clock);
        let timer_task = tokio::spawn(async move {
            loop {
                let _ = targets.dispatch_tick();
                clock.sleep(interval).await;
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "poller started");
        *active = Some(ActivePoll {
            interval,
            timer_task,
        });
    }

    /// Cancels the timer. Refreshes already dispatched are left to finish.
    pub async fn stop(&self) {
        let active = self.active.lock().await.take();
        if let Some(active) = active {
            active.timer_task.abort();
            info!("poller stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn interval(&self) -> Option<Duration> {
        self.active.lock().await.as_ref().map(|active| active.interval)
    }

    /// One combined refresh awaited in place, outside the tick guard.
    pub async fn refresh_now(&self) -> TickOutcome {
        combined_refresh(&self.targets.stats, &self.targets.feed).await
    }

    pub fn tick_in_flight(&self) -> bool {
        self.targets.tick_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for PollingCoordinator {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.timer_task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/polling_tests.rs"]
mod tests;
