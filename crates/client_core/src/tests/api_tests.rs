use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use shared::domain::StarRating;
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Clone, Default)]
struct ServerState {
    replies: Arc<Mutex<HashMap<&'static str, (StatusCode, String)>>>,
    posted: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl ServerState {
    async fn reply(&self, route: &'static str) -> impl IntoResponse {
        let (status, body) = self
            .replies
            .lock()
            .await
            .get(route)
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, String::new()));
        (status, [(header::CONTENT_TYPE, "application/json")], body)
    }

    async fn set(&self, route: &'static str, status: StatusCode, body: impl Into<String>) {
        self.replies
            .lock()
            .await
            .insert(route, (status, body.into()));
    }
}

async fn handle_stats(State(state): State<ServerState>) -> impl IntoResponse {
    state.reply(STATS_ROUTE).await
}

async fn handle_list_reviews(State(state): State<ServerState>) -> impl IntoResponse {
    state.reply("GET /api/reviews").await
}

async fn handle_submit_review(
    State(state): State<ServerState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    state.posted.lock().await.push(body);
    state.reply("POST /api/reviews").await
}

async fn handle_health(State(state): State<ServerState>) -> impl IntoResponse {
    state.reply(HEALTH_ROUTE).await
}

async fn spawn_feedback_server() -> anyhow::Result<(HttpFeedbackApi, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route(STATS_ROUTE, get(handle_stats))
        .route(
            REVIEWS_ROUTE,
            get(handle_list_reviews).post(handle_submit_review),
        )
        .route(HEALTH_ROUTE, get(handle_health))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let api = HttpFeedbackApi::new(ClientConfig::new(format!("http://{addr}"))?)?;
    Ok((api, state))
}

#[tokio::test]
async fn fetch_stats_decodes_success_envelope() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server
        .set(
            STATS_ROUTE,
            StatusCode::OK,
            serde_json::json!({
                "success": true,
                "data": {
                    "total": 3,
                    "average_rating": 3.7,
                    "by_rating": [{"rating": 3, "count": 1}, {"rating": 4, "count": 2}]
                }
            })
            .to_string(),
        )
        .await;

    let stats = api.fetch_stats().await.expect("stats").expect("data");
    assert_eq!(stats.total, 3);
    assert_eq!(stats.average_rating, 3.7);
    assert_eq!(stats.by_rating.len(), 2);
}

#[tokio::test]
async fn fetch_reviews_accepts_naive_timestamps_and_missing_data() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server
        .set(
            "GET /api/reviews",
            StatusCode::OK,
            serde_json::json!({
                "success": true,
                "data": [{
                    "id": 12,
                    "rating": 5,
                    "review": "Great service",
                    "created_at": "2025-02-01T09:15:30.250000",
                    "ai_summary": "Positive",
                    "ai_recommended_actions": "• Share with the team",
                    "ai_response": "Thanks!"
                }]
            })
            .to_string(),
        )
        .await;

    let reviews = api.fetch_reviews().await.expect("reviews");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating, StarRating::new(5).expect("rating"));
    assert_eq!(reviews[0].ai_response, "Thanks!");

    server
        .set("GET /api/reviews", StatusCode::OK, r#"{"success":true,"data":null}"#)
        .await;
    assert!(api.fetch_reviews().await.expect("empty").is_empty());
}

#[tokio::test]
async fn success_false_carries_server_message() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server
        .set(
            STATS_ROUTE,
            StatusCode::OK,
            r#"{"success":false,"error":"Failed to fetch stats."}"#,
        )
        .await;

    match api.fetch_stats().await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, StatusCode::OK);
            assert_eq!(message.as_deref(), Some("Failed to fetch stats."));
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_is_an_api_failure_even_without_envelope() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server
        .set(
            "POST /api/reviews",
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body","rating"],"msg":"too large"}]}"#,
        )
        .await;
    server
        .set(STATS_ROUTE, StatusCode::INTERNAL_SERVER_ERROR, "oops")
        .await;

    let submission = ReviewSubmission {
        rating: StarRating::new(5).expect("rating"),
        review: String::new(),
    };
    match api.submit_review(&submission).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert!(message.is_none());
        }
        other => panic!("expected api error, got {other:?}"),
    }
    assert!(matches!(
        api.fetch_stats().await,
        Err(ClientError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None
        })
    ));
}

#[tokio::test]
async fn error_status_with_envelope_keeps_message() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server
        .set(
            "GET /api/reviews",
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"success":false,"error":"Failed to fetch reviews."}"#,
        )
        .await;

    let err = api.fetch_reviews().await.expect_err("failure");
    assert_eq!(err.user_message("fallback"), "Failed to fetch reviews.");
}

#[tokio::test]
async fn garbage_success_body_is_a_decode_error() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server.set(STATS_ROUTE, StatusCode::OK, "<html>").await;
    server
        .set(
            "GET /api/reviews",
            StatusCode::OK,
            r#"{"success":true,"data":[{"id":1,"rating":9}]}"#,
        )
        .await;

    assert!(matches!(api.fetch_stats().await, Err(ClientError::Decode(_))));
    assert!(matches!(api.fetch_reviews().await, Err(ClientError::Decode(_))));
}

#[tokio::test]
async fn submit_review_posts_rating_and_text() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server
        .set(
            "POST /api/reviews",
            StatusCode::OK,
            serde_json::json!({
                "success": true,
                "data": {
                    "id": 44,
                    "rating": 4,
                    "review": "Great service",
                    "ai_response": "Thanks!",
                    "created_at": "2025-02-01T09:15:30"
                }
            })
            .to_string(),
        )
        .await;

    let receipt = api
        .submit_review(&ReviewSubmission {
            rating: StarRating::new(4).expect("rating"),
            review: "Great service".into(),
        })
        .await
        .expect("submit")
        .expect("receipt");
    assert_eq!(receipt.ai_response.as_deref(), Some("Thanks!"));
    assert_eq!(receipt.id, Some(shared::domain::ReviewId(44)));
    assert!(receipt.created_at.is_some());

    let posted = server.posted.lock().await.clone();
    assert_eq!(
        posted,
        vec![serde_json::json!({"rating": 4, "review": "Great service"})]
    );
}

#[tokio::test]
async fn health_reports_status() {
    let (api, server) = spawn_feedback_server().await.expect("spawn server");
    server.set(HEALTH_ROUTE, StatusCode::OK, r#"{"status":"ok"}"#).await;
    assert_eq!(api.health().await.expect("health").status, "ok");
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = HttpFeedbackApi::new(ClientConfig::new(format!("http://{addr}")).expect("config"))
        .expect("client");
    let err = api.fetch_reviews().await.expect_err("no server");
    assert!(matches!(err, ClientError::Network(_)));
    assert_eq!(err.user_message("fallback"), crate::error::GENERIC_FAILURE);
}
