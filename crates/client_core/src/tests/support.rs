use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use shared::{
    domain::{ReviewId, StarRating},
    protocol::{HealthStatus, RatingCount, Review, ReviewSubmission, StatsData, SubmitReceipt},
};
use tokio::sync::{broadcast, oneshot, Mutex};

use crate::{
    api::FeedbackApi,
    error::{ClientError, Result},
    DashboardEvent,
};

#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Api(Option<String>),
    Decode(String),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Api(message) => Err(ClientError::Api {
                status: StatusCode::OK,
                message,
            }),
            Self::Decode(message) => Err(ClientError::Decode(message)),
        }
    }
}

struct Step<T> {
    reply: Reply<T>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Per-endpoint script: queued steps first, then `fallback` forever.
struct Script<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    fallback: Mutex<Reply<T>>,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    fn new(fallback: Reply<T>) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicUsize::new(0),
        }
    }

    async fn push(&self, reply: Reply<T>) {
        self.steps.lock().await.push_back(Step { reply, gate: None });
    }

    async fn push_gated(&self, reply: Reply<T>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().await.push_back(Step {
            reply,
            gate: Some(rx),
        });
        tx
    }

    async fn next(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().await.pop_front();
        let reply = match step {
            Some(Step { reply, gate }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                reply
            }
            None => self.fallback.lock().await.clone(),
        };
        reply.into_result()
    }
}

pub struct FakeApi {
    stats: Script<Option<StatsData>>,
    reviews: Script<Vec<Review>>,
    submit: Script<Option<SubmitReceipt>>,
    pub submissions: Mutex<Vec<ReviewSubmission>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stats: Script::new(Reply::Ok(Some(stats(0, 0.0, &[])))),
            reviews: Script::new(Reply::Ok(Vec::new())),
            submit: Script::new(Reply::Ok(None)),
            submissions: Mutex::new(Vec::new()),
        })
    }

    pub async fn push_stats(&self, reply: Reply<Option<StatsData>>) {
        self.stats.push(reply).await;
    }

    pub async fn push_stats_gated(&self, reply: Reply<Option<StatsData>>) -> oneshot::Sender<()> {
        self.stats.push_gated(reply).await
    }

    pub async fn set_stats_fallback(&self, reply: Reply<Option<StatsData>>) {
        *self.stats.fallback.lock().await = reply;
    }

    pub async fn push_reviews(&self, reply: Reply<Vec<Review>>) {
        self.reviews.push(reply).await;
    }

    pub async fn push_reviews_gated(&self, reply: Reply<Vec<Review>>) -> oneshot::Sender<()> {
        self.reviews.push_gated(reply).await
    }

    pub async fn set_reviews_fallback(&self, reply: Reply<Vec<Review>>) {
        *self.reviews.fallback.lock().await = reply;
    }

    pub async fn push_submit(&self, reply: Reply<Option<SubmitReceipt>>) {
        self.submit.push(reply).await;
    }

    pub async fn push_submit_gated(
        &self,
        reply: Reply<Option<SubmitReceipt>>,
    ) -> oneshot::Sender<()> {
        self.submit.push_gated(reply).await
    }

    pub fn stats_calls(&self) -> usize {
        self.stats.calls.load(Ordering::SeqCst)
    }

    pub fn reviews_calls(&self) -> usize {
        self.reviews.calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackApi for FakeApi {
    async fn fetch_stats(&self) -> Result<Option<StatsData>> {
        self.stats.next().await
    }

    async fn fetch_reviews(&self) -> Result<Vec<Review>> {
        self.reviews.next().await
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<Option<SubmitReceipt>> {
        self.submissions.lock().await.push(submission.clone());
        self.submit.next().await
    }

    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "ok".into(),
        })
    }
}

pub fn review(id: i64, rating: u8, text: &str) -> Review {
    Review {
        id: ReviewId(id),
        rating: StarRating::new(rating).expect("rating in range"),
        review: text.to_string(),
        created_at: Utc
            .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
            .single()
            .expect("timestamp"),
        ai_summary: format!("summary {id}"),
        ai_recommended_actions: format!("actions {id}"),
        ai_response: format!("response {id}"),
    }
}

pub fn stats(total: u64, average_rating: f64, counts: &[(i64, u64)]) -> StatsData {
    StatsData {
        total,
        average_rating,
        by_rating: counts
            .iter()
            .map(|&(rating, count)| RatingCount { rating, count })
            .collect(),
    }
}

pub fn rating(value: u8) -> StarRating {
    StarRating::new(value).expect("rating in range")
}

pub fn events() -> broadcast::Sender<DashboardEvent> {
    broadcast::channel(64).0
}

pub async fn next_event(rx: &mut broadcast::Receiver<DashboardEvent>) -> DashboardEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event before timeout")
        .expect("event channel open")
}

/// Lets a spawned task reach its next await point.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
