//! Transport seam for the feedback backend.
//!
//! Components talk to [`FeedbackApi`] only, so tests can swap the HTTP client
//! for an in-process fake.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::protocol::{
    ApiEnvelope, HealthStatus, Review, ReviewSubmission, StatsData, SubmitReceipt,
};
use tracing::debug;

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
};

pub const STATS_ROUTE: &str = "/api/stats";
pub const REVIEWS_ROUTE: &str = "/api/reviews";
pub const HEALTH_ROUTE: &str = "/health";

#[async_trait]
pub trait FeedbackApi: Send + Sync {
    /// `Ok(None)` when the backend reported success without a payload.
    async fn fetch_stats(&self) -> Result<Option<StatsData>>;
    /// A successful response without a payload is an empty collection.
    async fn fetch_reviews(&self) -> Result<Vec<Review>>;
    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<Option<SubmitReceipt>>;
    async fn health(&self) -> Result<HealthStatus>;
}

pub struct HttpFeedbackApi {
    http: Client,
    config: ClientConfig,
}

impl HttpFeedbackApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl FeedbackApi for HttpFeedbackApi {
    async fn fetch_stats(&self) -> Result<Option<StatsData>> {
        let res = self.http.get(self.config.endpoint(STATS_ROUTE)).send().await?;
        read_envelope(res).await
    }

    async fn fetch_reviews(&self) -> Result<Vec<Review>> {
        let res = self
            .http
            .get(self.config.endpoint(REVIEWS_ROUTE))
            .send()
            .await?;
        let reviews: Option<Vec<Review>> = read_envelope(res).await?;
        Ok(reviews.unwrap_or_default())
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<Option<SubmitReceipt>> {
        let res = self
            .http
            .post(self.config.endpoint(REVIEWS_ROUTE))
            .json(submission)
            .send()
            .await?;
        read_envelope(res).await
    }

    async fn health(&self) -> Result<HealthStatus> {
        let res = self
            .http
            .get(self.config.endpoint(HEALTH_ROUTE))
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status,
                message: None,
            });
        }
        res.json()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }
}

/// Non-2xx and `success: false` are the same failure; the envelope's `error`
/// is carried through when the body has one.
async fn read_envelope<T: DeserializeOwned>(res: Response) -> Result<Option<T>> {
    let status = res.status();
    let body = res.bytes().await?;

    let envelope = match serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&body) {
        Ok(envelope) => envelope,
        Err(err) if status.is_success() => return Err(ClientError::Decode(err.to_string())),
        Err(_) => {
            debug!(%status, "non-envelope error body");
            return Err(ClientError::Api {
                status,
                message: None,
            });
        }
    };

    if !status.is_success() || !envelope.success {
        return Err(ClientError::Api {
            status,
            message: envelope.error,
        });
    }

    match envelope.data {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data)
            .map(Some)
            .map_err(|err| ClientError::Decode(err.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
