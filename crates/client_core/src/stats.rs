use std::sync::Arc;

use shared::{domain::StarRating, protocol::StatsData};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    api::FeedbackApi,
    render::{render_stats, LoadSlot, StatsChart},
    sequence::{RefreshOutcome, RefreshSequencer, Watermark},
    DashboardEvent,
};

pub const STATS_LOAD_FALLBACK: &str = "Failed to load stats.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingBucket {
    pub rating: StarRating,
    pub count: u64,
}

/// Per-rating counts, always five buckets in ascending rating order.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingDistribution {
    total: u64,
    average_rating: f64,
    buckets: Vec<RatingBucket>,
}

impl RatingDistribution {
    pub fn from_stats(stats: &StatsData) -> Self {
        let mut buckets: Vec<RatingBucket> = StarRating::all()
            .map(|rating| RatingBucket { rating, count: 0 })
            .collect();

        for entry in &stats.by_rating {
            match StarRating::try_from(entry.rating) {
                Ok(rating) => {
                    let bucket = &mut buckets[usize::from(rating.value() - StarRating::MIN)];
                    bucket.count = bucket.count.saturating_add(entry.count);
                }
                Err(err) => warn!(%err, count = entry.count, "dropping out-of-range stats bucket"),
            }
        }

        let average_rating = if stats.average_rating.is_finite() {
            stats
                .average_rating
                .clamp(0.0, f64::from(StarRating::MAX))
        } else {
            0.0
        };

        let distribution = Self {
            total: stats.total,
            average_rating,
            buckets,
        };
        if !distribution.is_consistent() {
            warn!(
                total = distribution.total,
                bucket_sum = distribution.bucket_sum(),
                "stats buckets do not add up to total"
            );
        }
        distribution
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    pub fn buckets(&self) -> &[RatingBucket] {
        &self.buckets
    }

    pub fn bucket_sum(&self) -> u64 {
        self.buckets
            .iter()
            .fold(0u64, |sum, bucket| sum.saturating_add(bucket.count))
    }

    pub fn is_consistent(&self) -> bool {
        self.bucket_sum() == self.total
    }
}

/// What the stats panel currently shows. `chart` only ever holds the last
/// successfully rendered distribution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsPanel {
    pub chart: Option<StatsChart>,
    pub slot: LoadSlot,
}

#[derive(Default)]
struct StatsState {
    distribution: Option<RatingDistribution>,
    panel: StatsPanel,
    watermark: Watermark,
}

pub struct StatsAggregatorView {
    api: Arc<dyn FeedbackApi>,
    sequencer: RefreshSequencer,
    state: Mutex<StatsState>,
    events: broadcast::Sender<DashboardEvent>,
}

impl StatsAggregatorView {
    pub fn new(api: Arc<dyn FeedbackApi>, events: broadcast::Sender<DashboardEvent>) -> Self {
        Self {
            api,
            sequencer: RefreshSequencer::default(),
            state: Mutex::new(StatsState::default()),
            events,
        }
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.sequencer.issue();
        let result = self.api.fetch_stats().await;

        let mut state = self.state.lock().await;
        if state.watermark.is_behind(ticket) {
            debug!(seq = ticket, "discarding stale stats response");
            return RefreshOutcome::Stale;
        }

        let outcome = match result {
            Ok(Some(stats)) => {
                state.watermark.advance(ticket);
                let distribution = RatingDistribution::from_stats(&stats);
                state.panel = StatsPanel {
                    chart: Some(render_stats(&distribution)),
                    slot: LoadSlot::Hidden,
                };
                info!(seq = ticket, total = distribution.total(), "stats refreshed");
                state.distribution = Some(distribution);
                RefreshOutcome::Applied
            }
            Ok(None) => {
                debug!(seq = ticket, "stats response carried no data");
                return RefreshOutcome::Unchanged;
            }
            Err(err) => {
                warn!(seq = ticket, error = %err, "stats refresh failed");
                state.panel.slot = LoadSlot::Failed(err.user_message(STATS_LOAD_FALLBACK));
                RefreshOutcome::Failed
            }
        };

        let panel = state.panel.clone();
        drop(state);
        let _ = self.events.send(DashboardEvent::StatsUpdated(panel));
        outcome
    }

    pub async fn panel(&self) -> StatsPanel {
        self.state.lock().await.panel.clone()
    }

    pub async fn distribution(&self) -> Option<RatingDistribution> {
        self.state.lock().await.distribution.clone()
    }
}

#[cfg(test)]
#[path = "tests/stats_tests.rs"]
mod tests;
