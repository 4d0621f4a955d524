use reqwest::StatusCode;
use thiserror::Error;

pub const VALIDATION_RATING_REQUIRED: &str = "Please select a rating between 1 and 5.";
pub const VALIDATION_REVIEW_TOO_LONG: &str = "Review must be 5000 characters or fewer.";
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; no request was made.
    #[error("{0}")]
    Validation(String),
    #[error("a submission is already in flight")]
    Busy,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx status or a `success: false` envelope.
    #[error("api error ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Text to show a user. Server and validation messages are used verbatim;
    /// an API failure without a message falls back to `api_fallback`.
    pub fn user_message(&self, api_fallback: &str) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::Api { .. } => api_fallback.to_string(),
            Self::Busy | Self::Network(_) | Self::Decode(_) => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
