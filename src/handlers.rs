use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::history::Turn;
use crate::sessions::{SessionManager, SessionStats, TurnOutcome};
use crate::tools::ToolInfo;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: String,
    pub provider_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
    pub model: String,
    pub tools: usize,
    pub sessions: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_error = match state.sessions.provider_health().await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Provider health check failed: {e}");
            Some(e.to_string())
        }
    };
    Json(HealthResponse {
        status: if provider_error.is_none() { "ok" } else { "degraded" },
        provider: state.sessions.provider_name().to_string(),
        provider_ready: provider_error.is_none(),
        provider_error,
        model: state.sessions.model().to_string(),
        tools: state.sessions.tools().len(),
        sessions: state.sessions.count().await,
    })
}

pub async fn list_tools_handler(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    Json(state.sessions.tools().tool_infos())
}

// --- Sessions ---

#[derive(Serialize)]
pub struct SessionCreated {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub async fn create_session_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreated>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            id: session.id,
            created_at: session.created_at,
        }),
    )
}

pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

pub async fn submit_turn_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    let session = state.sessions.get(id).await?;
    let outcome = session.process_turn(&request.text).await?;
    Ok(Json(outcome))
}

pub async fn get_history_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Turn>>, AppError> {
    let session = state.sessions.get(id).await?;
    Ok(Json(session.history().await))
}

pub async fn reset_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let session = state.sessions.get(id).await?;
    session.reset().await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub created_at: DateTime<Utc>,
    pub distinct_tools: usize,
    #[serde(flatten)]
    pub stats: SessionStats,
}

pub async fn get_stats_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatsResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let stats = session.stats().await;
    Ok(Json(StatsResponse {
        created_at: session.created_at,
        distinct_tools: stats.distinct_tools(),
        stats,
    }))
}
