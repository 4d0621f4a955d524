//! Cached review collection and the rating filter projected over it.

use std::{fmt, str::FromStr, sync::Arc};

use shared::{domain::StarRating, protocol::Review};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    api::FeedbackApi,
    error::ClientError,
    render::{render_feed, LoadSlot, Notice, ReviewRow},
    sequence::{RefreshOutcome, RefreshSequencer, Watermark},
    DashboardEvent,
};

pub const REVIEWS_LOAD_FALLBACK: &str = "Failed to load reviews.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterState {
    #[default]
    All,
    Rating(StarRating),
}

impl FilterState {
    pub fn matches(self, review: &Review) -> bool {
        match self {
            Self::All => true,
            Self::Rating(rating) => review.rating == rating,
        }
    }

    /// Stable projection: cache order is preserved and nothing is re-sorted.
    pub fn apply(self, cache: &[Review]) -> Vec<&Review> {
        cache.iter().filter(|review| self.matches(review)).collect()
    }
}

impl FromStr for FilterState {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        raw.parse::<u8>()
            .ok()
            .and_then(|value| StarRating::new(value).ok())
            .map(Self::Rating)
            .ok_or_else(|| {
                ClientError::validation(format!("unknown filter '{raw}'; expected all or 1-5"))
            })
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Rating(rating) => write!(f, "{rating}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedPanel {
    pub filter: FilterState,
    pub rows: Vec<ReviewRow>,
    /// Informational/admin notice; fetch failures never land here.
    pub notice: Option<Notice>,
    pub slot: LoadSlot,
}

#[derive(Default)]
struct FeedState {
    cache: Vec<Review>,
    filter: FilterState,
    panel: FeedPanel,
    watermark: Watermark,
}

impl FeedState {
    fn rerender(&mut self) {
        let (rows, notice) = render_feed(self.filter.apply(&self.cache));
        self.panel.filter = self.filter;
        self.panel.rows = rows;
        self.panel.notice = notice;
        self.panel.slot = LoadSlot::Hidden;
    }
}

pub struct ReviewFeedStore {
    api: Arc<dyn FeedbackApi>,
    sequencer: RefreshSequencer,
    state: Mutex<FeedState>,
    events: broadcast::Sender<DashboardEvent>,
}

impl ReviewFeedStore {
    pub fn new(api: Arc<dyn FeedbackApi>, events: broadcast::Sender<DashboardEvent>) -> Self {
        Self {
            api,
            sequencer: RefreshSequencer::default(),
            state: Mutex::new(FeedState::default()),
            events,
        }
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.sequencer.issue();
        let result = self.api.fetch_reviews().await;

        // The filter is read here, after the await, so a change made while the
        // fetch was in flight is honoured.
        let mut state = self.state.lock().await;
        if state.watermark.is_behind(ticket) {
            debug!(seq = ticket, "discarding stale reviews response");
            return RefreshOutcome::Stale;
        }

        let outcome = match result {
            Ok(reviews) => {
                state.watermark.advance(ticket);
                info!(seq = ticket, count = reviews.len(), "reviews refreshed");
                state.cache = reviews;
                state.rerender();
                RefreshOutcome::Applied
            }
            Err(err) => {
                warn!(seq = ticket, error = %err, "reviews refresh failed");
                state.panel.slot = LoadSlot::Failed(err.user_message(REVIEWS_LOAD_FALLBACK));
                RefreshOutcome::Failed
            }
        };

        let panel = state.panel.clone();
        drop(state);
        let _ = self.events.send(DashboardEvent::ReviewsUpdated(panel));
        outcome
    }

    /// Re-derives the visible rows from the cache; never touches the network.
    pub async fn set_filter(&self, filter: FilterState) -> FeedPanel {
        let panel = {
            let mut state = self.state.lock().await;
            state.filter = filter;
            state.rerender();
            state.panel.clone()
        };
        debug!(%filter, rows = panel.rows.len(), "filter applied");
        let _ = self.events.send(DashboardEvent::ReviewsUpdated(panel.clone()));
        panel
    }

    pub async fn filter(&self) -> FilterState {
        self.state.lock().await.filter
    }

    pub async fn panel(&self) -> FeedPanel {
        self.state.lock().await.panel.clone()
    }

    pub async fn visible(&self) -> Vec<Review> {
        let state = self.state.lock().await;
        state.filter.apply(&state.cache).into_iter().cloned().collect()
    }

    pub async fn cached(&self) -> Vec<Review> {
        self.state.lock().await.cache.clone()
    }
}

#[cfg(test)]
#[path = "tests/feed_tests.rs"]
mod tests;
