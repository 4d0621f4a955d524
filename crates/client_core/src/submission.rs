use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::StarRating,
    protocol::{ReviewSubmission, SubmitReceipt},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    api::{FeedbackApi, HttpFeedbackApi},
    config::ClientConfig,
    error::{ClientError, Result, VALIDATION_RATING_REQUIRED, VALIDATION_REVIEW_TOO_LONG},
    render::{
        star_highlight, Notice, SubmissionForm, SUBMIT_LABEL_BUSY, SUBMIT_LABEL_IDLE,
    },
};

pub const MAX_REVIEW_CHARS: usize = 5000;
pub const SUBMIT_SUCCESS: &str = "Thank you! Your review has been submitted.";
pub const SUBMIT_FALLBACK: &str = "Failed to submit review.";

#[derive(Default)]
struct FormState {
    rating: Option<StarRating>,
    text: String,
    notice: Option<Notice>,
    ai_response: Option<String>,
}

/// Releases the submit control when dropped, whether the submit finished,
/// failed, or its future was cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SubmissionController {
    api: Arc<dyn FeedbackApi>,
    state: Mutex<FormState>,
    submitting: AtomicBool,
}

impl SubmissionController {
    pub fn new(api: Arc<dyn FeedbackApi>) -> Self {
        Self {
            api,
            state: Mutex::new(FormState::default()),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn connect(config: ClientConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFeedbackApi::new(config)?)))
    }

    /// Out-of-range values are rejected and leave the selection unchanged.
    pub async fn select_rating(&self, value: i64) -> Result<SubmissionForm> {
        let rating = StarRating::try_from(value)
            .map_err(|err| ClientError::validation(err.to_string()))?;
        let mut state = self.state.lock().await;
        state.rating = Some(rating);
        Ok(self.render(&state))
    }

    pub async fn update_review_text(&self, text: impl Into<String>) -> SubmissionForm {
        let mut state = self.state.lock().await;
        state.text = text.into();
        self.render(&state)
    }

    pub async fn form(&self) -> SubmissionForm {
        let state = self.state.lock().await;
        self.render(&state)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub async fn submit(&self) -> Result<Option<SubmitReceipt>> {
        let _in_flight = InFlight::acquire(&self.submitting).ok_or(ClientError::Busy)?;

        let submission = {
            let mut state = self.state.lock().await;
            let Some(rating) = state.rating else {
                state.notice = Some(Notice::error(VALIDATION_RATING_REQUIRED));
                return Err(ClientError::validation(VALIDATION_RATING_REQUIRED));
            };
            let review = state.text.trim().to_string();
            if review.chars().count() > MAX_REVIEW_CHARS {
                state.notice = Some(Notice::error(VALIDATION_REVIEW_TOO_LONG));
                return Err(ClientError::validation(VALIDATION_REVIEW_TOO_LONG));
            }
            state.notice = None;
            state.ai_response = None;
            ReviewSubmission { rating, review }
        };

        let result = self.api.submit_review(&submission).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(receipt) => {
                info!(rating = submission.rating.value(), "review submitted");
                state.notice = Some(Notice::success(SUBMIT_SUCCESS));
                state.ai_response = receipt
                    .as_ref()
                    .and_then(|receipt| receipt.ai_response.clone())
                    .filter(|response| !response.is_empty());
                state.rating = None;
                state.text.clear();
                Ok(receipt)
            }
            Err(err) => {
                warn!(error = %err, "review submission failed");
                state.notice = Some(Notice::error(err.user_message(SUBMIT_FALLBACK)));
                Err(err)
            }
        }
    }

    fn render(&self, state: &FormState) -> SubmissionForm {
        let submitting = self.is_submitting();
        SubmissionForm {
            rating: state.rating.map_or(0, StarRating::value),
            stars: star_highlight(state.rating),
            text: state.text.clone(),
            char_count: state.text.chars().count().to_string(),
            submit_enabled: !submitting,
            submit_label: if submitting {
                SUBMIT_LABEL_BUSY
            } else {
                SUBMIT_LABEL_IDLE
            },
            notice: state.notice.clone(),
            ai_response: state.ai_response.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
