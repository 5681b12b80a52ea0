//! HTTP server for GitHub webhooks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::events::{IssueCommentEvent, PullRequestEvent};
use crate::orchestrator::EventOrchestrator;
use crate::signature::verify_signature;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Event orchestrator.
    pub orchestrator: Arc<EventOrchestrator>,
    /// Webhook signing secret, when verification is enabled.
    pub webhook_secret: Option<String>,
}

/// Build the HTTP router for the bot.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

/// Handle incoming GitHub webhooks.
///
/// Verifies the `X-Hub-Signature-256` signature when a secret is configured,
/// then routes on the `X-GitHub-Event` header. Unrecognized events are
/// acknowledged and ignored.
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let delivery_id = headers
        .get("X-GitHub-Delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!(
        event_type = %event_type,
        delivery_id = %delivery_id,
        "Received GitHub webhook"
    );

    if let Some(secret) = &state.webhook_secret {
        let Some(signature) = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
        else {
            warn!("Missing X-Hub-Signature-256 header");
            return Err(StatusCode::UNAUTHORIZED);
        };

        if !verify_signature(&body, signature, secret) {
            warn!("Invalid webhook signature");
            return Err(StatusCode::UNAUTHORIZED);
        }
        debug!("Webhook signature verified");
    }

    match event_type {
        "pull_request" => {
            let payload: PullRequestEvent = serde_json::from_slice(&body).map_err(|e| {
                error!(error = %e, "Failed to parse pull_request payload");
                StatusCode::BAD_REQUEST
            })?;
            handle_pull_request(&state, &payload).await
        }
        "issue_comment" => {
            let payload: IssueCommentEvent = serde_json::from_slice(&body).map_err(|e| {
                error!(error = %e, "Failed to parse issue_comment payload");
                StatusCode::BAD_REQUEST
            })?;
            Ok(Json(state.orchestrator.comment_created(&payload).await))
        }
        "ping" => Ok(Json(json!({ "status": "pong" }))),
        other => {
            debug!(event_type = %other, "Ignoring unhandled event type");
            Ok(Json(json!({
                "status": "ignored",
                "reason": "unhandled_event_type"
            })))
        }
    }
}

async fn handle_pull_request(
    state: &AppState,
    payload: &PullRequestEvent,
) -> Result<Json<Value>, StatusCode> {
    match payload.action.as_str() {
        "opened" => Ok(Json(state.orchestrator.pull_request_opened(payload).await)),
        "closed" if payload.pull_request.merged => {
            Ok(Json(state.orchestrator.pull_request_merged(payload).await))
        }
        action => {
            debug!(
                action = %action,
                merged = payload.pull_request.merged,
                "Ignoring pull_request action"
            );
            Ok(Json(json!({
                "status": "ignored",
                "reason": "unhandled_action"
            })))
        }
    }
}
