use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod polling;
pub mod render;
pub mod sequence;
pub mod stats;
pub mod submission;

pub use api::{FeedbackApi, HttpFeedbackApi};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use feed::{FeedPanel, FilterState, ReviewFeedStore};
pub use polling::{Clock, PollingCoordinator, TickOutcome, TokioClock};
pub use sequence::RefreshOutcome;
pub use stats::{RatingDistribution, StatsAggregatorView, StatsPanel};
pub use submission::SubmissionController;

/// Render notifications from the admin components. Each carries the full
/// panel so a subscriber can redraw without asking back.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    StatsUpdated(StatsPanel),
    ReviewsUpdated(FeedPanel),
}

/// Admin view: stats panel, review feed and the poller that keeps both fresh.
pub struct Dashboard {
    stats: Arc<StatsAggregatorView>,
    feed: Arc<ReviewFeedStore>,
    poller: PollingCoordinator,
    poll_interval: Duration,
    events: broadcast::Sender<DashboardEvent>,
}

impl Dashboard {
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let poll_interval = config.poll_interval;
        let api = Arc::new(HttpFeedbackApi::new(config)?);
        Ok(Self::new_with_dependencies(api, poll_interval, Arc::new(TokioClock)))
    }

    pub fn new_with_dependencies(
        api: Arc<dyn FeedbackApi>,
        poll_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let stats = Arc::new(StatsAggregatorView::new(Arc::clone(&api), events.clone()));
        let feed = Arc::new(ReviewFeedStore::new(api, events.clone()));
        let poller = PollingCoordinator::new(Arc::clone(&stats), Arc::clone(&feed), clock);
        Self {
            stats,
            feed,
            poller,
            poll_interval,
            events,
        }
    }

    pub async fn start(&self) {
        self.poller.start(self.poll_interval).await;
    }

    pub async fn stop(&self) {
        self.poller.stop().await;
    }

    pub async fn refresh_now(&self) -> TickOutcome {
        self.poller.refresh_now().await
    }

    pub async fn set_filter(&self, filter: FilterState) -> FeedPanel {
        self.feed.set_filter(filter).await
    }

    pub fn stats(&self) -> &StatsAggregatorView {
        &self.stats
    }

    pub fn feed(&self) -> &ReviewFeedStore {
        &self.feed
    }

    pub fn poller(&self) -> &PollingCoordinator {
        &self.poller
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
