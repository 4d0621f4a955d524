//! Pure render functions: data in, render model out.
//!
//! Nothing here touches a terminal or performs I/O; adapters take the models
//! and draw them. Every function returns a fresh model, so re-rendering never
//! leaks rows from an earlier pass.

use shared::{domain::StarRating, protocol::Review};

use crate::stats::RatingDistribution;

pub const EMPTY_REVIEW_PLACEHOLDER: &str = "No written review provided.";
pub const NO_REVIEWS_FOR_FILTER: &str = "No reviews found for the selected filter.";
pub const SUBMIT_LABEL_IDLE: &str = "Submit Review";
pub const SUBMIT_LABEL_BUSY: &str = "Submitting...";
pub const STAR: char = '★';
const DATE_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }
}

/// The per-panel loading/error slot, separate from any notice channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadSlot {
    #[default]
    Loading,
    Hidden,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketRow {
    pub rating: StarRating,
    pub label: String,
    pub fill_percent: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsChart {
    pub total: String,
    pub average: String,
    pub rows: Vec<BucketRow>,
}

pub fn fill_percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

pub fn render_stats(distribution: &RatingDistribution) -> StatsChart {
    let total = distribution.total();
    StatsChart {
        total: total.to_string(),
        average: format!("{:.1}", distribution.average_rating()),
        rows: distribution
            .buckets()
            .iter()
            .map(|bucket| BucketRow {
                rating: bucket.rating,
                label: format!("{}{STAR}", bucket.rating),
                fill_percent: fill_percent(bucket.count, total),
                count: bucket.count,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub stars: String,
    pub date: String,
    pub text: String,
    pub text_is_placeholder: bool,
    pub ai_summary: String,
    pub ai_recommended_actions: String,
    pub ai_response: String,
}

pub fn stars(rating: StarRating) -> String {
    STAR.to_string().repeat(usize::from(rating.value()))
}

pub fn render_review(review: &Review) -> ReviewRow {
    let has_text = !review.review.trim().is_empty();
    ReviewRow {
        stars: stars(review.rating),
        date: review.created_at.format(DATE_FORMAT).to_string(),
        text: if has_text {
            review.review.clone()
        } else {
            EMPTY_REVIEW_PLACEHOLDER.to_string()
        },
        text_is_placeholder: !has_text,
        ai_summary: review.ai_summary.clone(),
        ai_recommended_actions: review.ai_recommended_actions.clone(),
        ai_response: review.ai_response.clone(),
    }
}

/// Rows plus the notice that goes with them: an info notice when nothing
/// matched, none otherwise.
pub fn render_feed<'a>(visible: impl IntoIterator<Item = &'a Review>) -> (Vec<ReviewRow>, Option<Notice>) {
    let rows: Vec<ReviewRow> = visible.into_iter().map(render_review).collect();
    let notice = rows.is_empty().then(|| Notice::info(NO_REVIEWS_FOR_FILTER));
    (rows, notice)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionForm {
    pub rating: u8,
    /// `stars[i]` is lit when star `i + 1` is at or below the selected rating.
    pub stars: [bool; 5],
    pub text: String,
    pub char_count: String,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    pub notice: Option<Notice>,
    pub ai_response: Option<String>,
}

pub fn star_highlight(selected: Option<StarRating>) -> [bool; 5] {
    let selected = selected.map_or(0, StarRating::value);
    let mut lit = [false; 5];
    for (index, star) in lit.iter_mut().enumerate() {
        *star = index < usize::from(selected);
    }
    lit
}
