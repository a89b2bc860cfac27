//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CancelResponse, ChatRequest, ChatResponse, CredentialRequest, CredentialResponse,
    ErrorResponse, HistoryResponse, NavigateRequest, NavigateResponse, ReorderRequest,
    ToolsResponse,
};
use super::AppState;
use crate::deck::DeckSnapshot;
use crate::runtime::{ReorderError, SubmitError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Renderer boundary
        .route("/api/presentation", get(get_presentation))
        .route("/api/navigate", post(navigate))
        .route("/api/reorder", post(reorder))
        // Chat boundary
        .route("/api/history", get(get_history))
        .route("/api/tools", get(list_tools))
        .route("/api/chat", post(send_chat))
        .route("/api/cancel", post(cancel_turn))
        .route("/api/credential", post(set_credential))
        // SSE streaming
        .route("/api/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Renderer
// ============================================================

async fn get_presentation(State(state): State<AppState>) -> Json<DeckSnapshot> {
    Json(state.session.snapshot().await)
}

async fn navigate(
    State(state): State<AppState>,
    Json(req): Json<NavigateRequest>,
) -> Json<NavigateResponse> {
    let current_index = state.session.navigate(req.index).await;
    Json(NavigateResponse { current_index })
}

async fn reorder(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<DeckSnapshot>, AppError> {
    let snapshot = state
        .session
        .reorder(req.from, req.to)
        .await
        .map_err(|e| match e {
            ReorderError::Busy => AppError::Conflict(e.to_string()),
            ReorderError::Deck(_) => AppError::BadRequest(e.to_string()),
        })?;
    Ok(Json(snapshot))
}

// ============================================================
// Chat
// ============================================================

async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        entries: state.session.history().await,
        agent_working: state.session.state().is_working(),
    })
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.session.tools().definitions(),
    })
}

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    state.session.submit(&req.text).await.map_err(|e| {
        tracing::warn!(error = %e, "Rejected chat submission");
        AppError::from(e)
    })?;
    Ok(Json(ChatResponse { queued: true }))
}

async fn cancel_turn(State(state): State<AppState>) -> Result<Json<CancelResponse>, AppError> {
    state.session.cancel().await?;
    Ok(Json(CancelResponse { ok: true }))
}

async fn set_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<Json<CredentialResponse>, AppError> {
    if req.api_key.trim().is_empty() {
        return Err(AppError::BadRequest("api_key must not be empty".to_string()));
    }
    state.session.credentials().set(req.api_key);
    tracing::info!("API credential updated");
    Ok(Json(CredentialResponse {
        configured: state.session.credentials().is_set(),
    }))
}

// ============================================================
// Streaming
// ============================================================

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before taking the snapshot so nothing falls in between
    let broadcast_rx = state.session.subscribe();
    let init_event = state.session.init_event().await;
    sse_stream(init_event, broadcast_rx)
}

async fn get_version() -> &'static str {
    concat!("slidepilot ", env!("CARGO_PKG_VERSION"))
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PreconditionRequired(String),
    Internal(String),
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::EmptyMessage => AppError::BadRequest(e.to_string()),
            SubmitError::Busy => AppError::Conflict(e.to_string()),
            SubmitError::CredentialRequired => AppError::PreconditionRequired(e.to_string()),
            SubmitError::Closed => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::PreconditionRequired(msg) => (StatusCode::PRECONDITION_REQUIRED, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
