//! HTTP trigger endpoint for the external scheduler.
//!
//! A cron-style trigger hits `/settlement/run`; `?action=health` routes to
//! the read-only health check instead of a full pass. Authorization is a
//! bearer token compared against the configured secret; without a
//! configured secret the endpoint is open.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::error;

use crate::application::runner::ScheduledRunner;

#[derive(Clone)]
pub struct ApiState {
    pub runner: Arc<ScheduledRunner>,
    pub trigger_token: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/settlement/run", get(trigger).post(trigger))
        .with_state(state)
}

#[derive(Deserialize)]
struct TriggerParams {
    action: Option<String>,
}

/// Completed runs answer 200 even when steps failed; the body carries the
/// per-step errors. Only an error escaping the runner itself maps to 500.
async fn trigger(
    State(state): State<ApiState>,
    Query(params): Query<TriggerParams>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers, state.trigger_token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match params.action.as_deref() {
        Some("health") => match state.runner.health(Utc::now()).await {
            Ok(report) => (StatusCode::OK, Json(report)).into_response(),
            Err(err) => {
                error!(%err, "health check failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": err.to_string() })),
                )
                    .into_response()
            }
        },
        _ => {
            let report = state.runner.run().await;
            (StatusCode::OK, Json(report)).into_response()
        }
    }
}

fn authorized(headers: &HeaderMap, token: Option<&str>) -> bool {
    let Some(expected) = token else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == expected)
}
