//! REST API server for the assistant engine
//!
//! Exposes the turn loop, session management, suggestions, and export
//! over HTTP. Presentation lives entirely on the client side.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::error::AssistantError;
use crate::export::ExportDocument;
use crate::models::{ChatMessage, UserProfile};
use crate::oracle::Oracle;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CategorySuggestionRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct BudgetSuggestionRequest {
    pub category: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    id: Uuid,
    title: String,
    message_count: usize,
    created_at: String,
    last_modified: String,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<RwLock<Assistant>>,
    pub oracle: Arc<dyn Oracle>,
    pub profile: Arc<RwLock<UserProfile>>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("Received chat message ({} chars)", req.message.len());

    let mut assistant = state.assistant.write().await;

    let before = assistant.visible_history().await.len();

    match assistant.submit(&req.message).await {
        Ok(()) => {
            let history = assistant.visible_history().await;
            let appended: Vec<ChatMessage> = history[before.min(history.len())..].to_vec();
            let session_id = assistant.sessions().read().await.current_id();

            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "session_id": session_id,
                    "messages": appended,
                }))),
            )
        }
        Err(AssistantError::Busy) => (
            StatusCode::CONFLICT,
            Json(ApiResponse::error(
                "Assistant is busy with another submission".to_string(),
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Chat turn failed: {}", e))),
        ),
    }
}

/// =============================
/// Session Endpoints
/// =============================

async fn list_sessions(State(state): State<ApiState>) -> Json<ApiResponse> {
    let assistant = state.assistant.read().await;
    let sessions = assistant.sessions();
    let sessions = sessions.read().await;

    let summaries: Vec<SessionSummary> = sessions
        .sessions()
        .iter()
        .map(|s| SessionSummary {
            id: s.id,
            title: s.title.clone(),
            message_count: s.messages.len(),
            created_at: s.created_at.to_rfc3339(),
            last_modified: s.last_modified.to_rfc3339(),
        })
        .collect();

    Json(ApiResponse::success(serde_json::json!({
        "current": sessions.current_id(),
        "sessions": summaries,
    })))
}

async fn create_session(State(state): State<ApiState>) -> Json<ApiResponse> {
    let id = state.assistant.write().await.create_session().await;
    Json(ApiResponse::success(serde_json::json!({ "id": id })))
}

async fn select_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Json<ApiResponse> {
    state.assistant.write().await.select_session(id).await;
    Json(ApiResponse::success(serde_json::json!({ "selected": id })))
}

async fn rename_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Json<ApiResponse> {
    state
        .assistant
        .write()
        .await
        .rename_session(id, req.title)
        .await;
    Json(ApiResponse::success(serde_json::json!({ "renamed": id })))
}

async fn delete_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Json<ApiResponse> {
    state.assistant.write().await.delete_session(id).await;
    Json(ApiResponse::success(serde_json::json!({ "deleted": id })))
}

/// =============================
/// Suggestion Endpoints
/// =============================

async fn suggest_category(
    State(state): State<ApiState>,
    Json(req): Json<CategorySuggestionRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.oracle.suggest_category(&req.title).await {
        Ok(category) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                serde_json::json!({ "category": category }),
            )),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(format!("Suggestion failed: {}", e))),
        ),
    }
}

async fn suggest_budget(
    State(state): State<ApiState>,
    Json(req): Json<BudgetSuggestionRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let amounts: Vec<f64> = {
        let assistant = state.assistant.read().await;
        let ledger = assistant.ledger();
        let ledger = ledger.read().await;
        ledger
            .transactions()
            .iter()
            .filter(|t| {
                t.kind == crate::models::TransactionKind::Expense
                    && t.category.eq_ignore_ascii_case(&req.category)
            })
            .map(|t| t.amount)
            .collect()
    };

    match state
        .oracle
        .suggest_budget_amount(&req.category, &amounts)
        .await
    {
        Ok(limit) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({ "limit": limit }))),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(format!("Suggestion failed: {}", e))),
        ),
    }
}

/// =============================
/// Export Endpoint
/// =============================

async fn export_data(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let assistant = state.assistant.read().await;
    let ledger = assistant.ledger();
    let sessions = assistant.sessions();
    let ledger = ledger.read().await;
    let sessions = sessions.read().await;
    let profile = state.profile.read().await;

    let doc = ExportDocument::collect(&ledger, &sessions, &profile);
    (StatusCode::OK, Json(ApiResponse::success(doc)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:id/select", post(select_session))
        .route("/api/sessions/:id/rename", post(rename_session))
        .route("/api/sessions/:id", delete(delete_session))
        .route("/api/suggest/category", post(suggest_category))
        .route("/api/suggest/budget", post(suggest_budget))
        .route("/api/export", get(export_data))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
