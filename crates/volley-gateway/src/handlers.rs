// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Store mutations answer with the refreshed list, so clients never need a
//! follow-up GET. Store failures become `500 {"error": ...}`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use volley_bench::{BatchRequest, Phase, StartRejected};
use volley_core::{
    BatchId, GenerationConfig, GenerationSlot, HealthStatus, HistoryRecord, PromptKind, SavedPrompt,
    VolleyError,
};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Present when storage is not fully healthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

/// Body for `POST /api/prompts/{kind}`. The kind comes from the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePromptRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl SavePromptRequest {
    fn into_prompt(self, kind: PromptKind) -> SavedPrompt {
        let mut prompt = SavedPrompt::new(kind, self.title, self.content);
        if let Some(id) = self.id.filter(|id| !id.is_empty()) {
            prompt.id = id;
        }
        if let Some(created_at) = self.created_at {
            prompt.created_at = created_at;
        }
        prompt.is_favorite = self.is_favorite;
        prompt
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyBody {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub config: Option<GenerationConfig>,
    /// Overrides the stored key for this run only.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub id: BatchId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AbortResponse {
    pub aborted: bool,
}

/// Body of `GET /api/runs/current`.
#[derive(Debug, Serialize)]
pub struct RunSnapshot {
    pub phase: Phase,
    pub id: Option<BatchId>,
    pub slots: Vec<GenerationSlot>,
}

/// A handler failure rendered as `{status} {"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<VolleyError> for ApiError {
    fn from(e: VolleyError) -> Self {
        warn!(error = %e, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<StartRejected> for ApiError {
    fn from(e: StartRejected) -> Self {
        let status = match e {
            StartRejected::AlreadyRunning => StatusCode::CONFLICT,
            StartRejected::EmptyPrompts | StartRejected::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// GET /health, GET /api/health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let (status, storage) = match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", None),
        Ok(HealthStatus::Degraded(why)) => ("degraded", Some(why)),
        Ok(HealthStatus::Unhealthy(why)) => ("unhealthy", Some(why)),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        storage,
    })
}

// --- Prompts ---

pub async fn list_prompts(
    State(state): State<GatewayState>,
    Path(kind): Path<PromptKind>,
) -> ApiResult<Vec<SavedPrompt>> {
    Ok(Json(state.store.list_prompts(kind).await?))
}

pub async fn save_prompt(
    State(state): State<GatewayState>,
    Path(kind): Path<PromptKind>,
    Json(body): Json<SavePromptRequest>,
) -> ApiResult<Vec<SavedPrompt>> {
    let prompt = body.into_prompt(kind);
    Ok(Json(state.store.save_prompt(&prompt).await?))
}

pub async fn delete_prompt(
    State(state): State<GatewayState>,
    Path((kind, id)): Path<(PromptKind, String)>,
) -> ApiResult<Vec<SavedPrompt>> {
    Ok(Json(state.store.delete_prompt(kind, &id).await?))
}

pub async fn rename_prompt(
    State(state): State<GatewayState>,
    Path((kind, id)): Path<(PromptKind, String)>,
    Json(body): Json<RenameRequest>,
) -> ApiResult<Vec<SavedPrompt>> {
    Ok(Json(state.store.rename_prompt(kind, &id, &body.title).await?))
}

pub async fn toggle_prompt_favorite(
    State(state): State<GatewayState>,
    Path((kind, id)): Path<(PromptKind, String)>,
) -> ApiResult<Vec<SavedPrompt>> {
    Ok(Json(state.store.toggle_prompt_favorite(kind, &id).await?))
}

// --- History ---

pub async fn list_history(State(state): State<GatewayState>) -> ApiResult<Vec<HistoryRecord>> {
    Ok(Json(state.store.list_history().await?))
}

/// POST /api/history. Re-posting an existing id leaves the stored record as is.
pub async fn save_history(
    State(state): State<GatewayState>,
    Json(record): Json<HistoryRecord>,
) -> ApiResult<SuccessResponse> {
    state.store.insert_history(&record).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn delete_history(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<HistoryRecord>> {
    Ok(Json(state.store.delete_history(&id).await?))
}

pub async fn toggle_history_favorite(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<HistoryRecord>> {
    Ok(Json(state.store.toggle_history_favorite(&id).await?))
}

// --- Settings ---

pub async fn get_api_key(State(state): State<GatewayState>) -> ApiResult<ApiKeyBody> {
    let api_key = state.store.get_api_key().await?;
    Ok(Json(ApiKeyBody { api_key }))
}

pub async fn set_api_key(
    State(state): State<GatewayState>,
    Json(body): Json<ApiKeyBody>,
) -> ApiResult<SuccessResponse> {
    state
        .store
        .set_api_key(body.api_key.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

// --- Runs ---

/// POST /api/runs
///
/// Starts a batch and returns `202 {"id": ...}` without waiting for it.
pub async fn start_run(
    State(state): State<GatewayState>,
    Json(body): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<StartRunResponse>), ApiError> {
    let credential = run_credential(&state, body.api_key).await;
    let config = body.config.unwrap_or_else(|| state.defaults.clone());
    let request = BatchRequest::new(body.system_prompt, body.user_prompt, config)
        .with_credential(credential);

    let handle = state.orchestrator.start(request)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            id: handle.id().clone(),
        }),
    ))
}

pub async fn abort_run(State(state): State<GatewayState>) -> Json<AbortResponse> {
    Json(AbortResponse {
        aborted: state.orchestrator.abort(),
    })
}

pub async fn current_run(State(state): State<GatewayState>) -> Json<RunSnapshot> {
    let batch = state.orchestrator.current();
    Json(RunSnapshot {
        phase: state.orchestrator.phase(),
        id: batch.as_ref().map(|b| b.id().clone()),
        slots: batch.map(|b| b.aggregate().snapshot()).unwrap_or_default(),
    })
}

/// Request key, then the stored key, then the configured one. `None` leaves
/// the transport to its environment fallbacks.
async fn run_credential(state: &GatewayState, explicit: Option<String>) -> Option<String> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Some(key);
    }
    match state.store.get_api_key().await {
        Ok(Some(key)) => return Some(key),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to read stored API key"),
    }
    state.configured_credential.clone()
}
