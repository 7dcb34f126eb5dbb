//! REST endpoints for the messaging webhook layer and operators.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::error::Error;

use super::manager::{InboundMessage, OnboardingManager, OnboardingReply, OnboardingStatus};
use super::model::PatientProfile;
use super::state::OnboardingStep;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub user_id: String,
    /// `not_started`, `in_progress` or `completed`.
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<OnboardingStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<PatientProfile>,
}

impl StatusResponse {
    fn new(user_id: String, status: OnboardingStatus) -> Self {
        let (state, current_step, profile) = match status {
            OnboardingStatus::NotStarted => ("not_started", None, None),
            OnboardingStatus::InProgress(session) => {
                ("in_progress", Some(session.current_step), None)
            }
            OnboardingStatus::Completed(profile) => ("completed", None, Some(profile)),
        };
        Self {
            user_id,
            state,
            current_step,
            profile,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

fn require_user_id(raw: &str) -> Result<String, Error> {
    let user_id = raw.trim();
    if user_id.is_empty() {
        return Err(Error::BadRequest("userId must not be empty".to_string()));
    }
    Ok(user_id.to_string())
}

/// POST /api/onboarding/messages
///
/// Feed one inbound message through onboarding and return the reply to send.
async fn post_message(
    State(state): State<OnboardingRouteState>,
    Json(mut message): Json<InboundMessage>,
) -> Result<Json<OnboardingReply>, Error> {
    message.user_id = require_user_id(&message.user_id)?;
    Ok(Json(state.manager.handle_message(&message).await))
}

/// GET /api/onboarding/{user_id}
async fn get_status(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusResponse>, Error> {
    let user_id = require_user_id(&user_id)?;
    let status = state.manager.status(&user_id).await?;
    Ok(Json(StatusResponse::new(user_id, status)))
}

/// DELETE /api/onboarding/{user_id}
///
/// Clear a stale in-progress session. Completed profiles are untouched.
async fn delete_session(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
) -> Result<Json<ResetResponse>, Error> {
    let user_id = require_user_id(&user_id)?;
    let reset = state.manager.reset(&user_id).await?;
    Ok(Json(ResetResponse { reset }))
}

async fn health() -> &'static str {
    "ok"
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/messages", post(post_message))
        .route(
            "/api/onboarding/{user_id}",
            get(get_status).delete(delete_session),
        )
        .with_state(state)
}
