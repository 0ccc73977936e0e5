use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use brokersync_core::{BrokerKind, Trade};
use brokersync_engine::TokenStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_USER_ID_LEN: usize = 50;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        // Zerodha
        .route("/zerodha/login", get(zerodha_login))
        .route("/zerodha/callback", get(zerodha_callback))
        .route("/zerodha/sync/{user_id}", get(zerodha_sync))
        // Mock
        .route("/mock/login", post(mock_login))
        .route("/mock/sync/{user_id}", get(mock_sync))
        .route("/mock/token-status/{user_id}", get(mock_token_status))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn user_id_violations(user_id: &str) -> Vec<String> {
    let mut violations = Vec::new();
    if user_id.is_empty() {
        violations.push("userId is required".to_string());
    }
    if user_id.chars().count() > MAX_USER_ID_LEN {
        violations.push(format!("userId must be at most {} characters", MAX_USER_ID_LEN));
    }
    violations
}

fn reject(violations: Vec<String>) -> ApiResult<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(violations.join(", ")))
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

async fn service_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "Broker Sync Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "zerodha": {
                "login": "GET /zerodha/login",
                "callback": "GET /zerodha/callback?request_token=xxx",
                "sync": "GET /zerodha/sync/{userId}",
            },
            "mock": {
                "login": "POST /mock/login (body: {userId})",
                "sync": "GET /mock/sync/{userId}",
                "tokenStatus": "GET /mock/token-status/{userId}",
            },
        },
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncResponse {
    success: bool,
    user_id: String,
    broker: &'static str,
    trade_count: usize,
    trades: Vec<Trade>,
}

async fn sync_for(state: &AppState, user_id: String, kind: BrokerKind) -> ApiResult<Json<SyncResponse>> {
    reject(user_id_violations(&user_id))?;
    let trades = state.orchestrator.sync_trades(&user_id, kind.tag()).await?;
    Ok(Json(SyncResponse {
        success: true,
        user_id,
        broker: kind.tag(),
        trade_count: trades.len(),
        trades,
    }))
}

// ---------------------------------------------------------------------------
// Zerodha
// ---------------------------------------------------------------------------

async fn zerodha_login(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::to(&state.orchestrator.login_url())
}

#[derive(Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    request_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallbackResponse {
    success: bool,
    message: &'static str,
    user_id: String,
}

async fn zerodha_callback(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> ApiResult<Json<CallbackResponse>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    if query.request_token.is_empty() {
        return Err(ApiError::Validation("request_token is required".to_string()));
    }

    let token = state
        .orchestrator
        .complete_zerodha_login(&query.request_token)
        .await?;

    Ok(Json(CallbackResponse {
        success: true,
        message: "Zerodha login successful! You can now sync trades.",
        user_id: token.user_id,
    }))
}

async fn zerodha_sync(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<SyncResponse>> {
    sync_for(&state, user_id, BrokerKind::ZerodhaReal).await
}

// ---------------------------------------------------------------------------
// Mock
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    user_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    success: bool,
    message: &'static str,
    user_id: String,
    expires_at: DateTime<Utc>,
    note: String,
}

async fn mock_login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    reject(user_id_violations(&req.user_id))?;

    let token = state.orchestrator.mock_login(&req.user_id).await;
    let ttl_minutes = ((token.expires_at - Utc::now()).num_seconds().max(0) + 59) / 60;

    Ok(Json(LoginResponse {
        success: true,
        message: "Mock login successful!",
        user_id: token.user_id,
        expires_at: token.expires_at,
        note: format!("Token expires in {} minutes for testing refresh logic", ttl_minutes),
    }))
}

async fn mock_sync(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<SyncResponse>> {
    sync_for(&state, user_id, BrokerKind::Mock).await
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenStatusResponse {
    success: bool,
    #[serde(flatten)]
    status: TokenStatus,
}

async fn mock_token_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<TokenStatusResponse>> {
    reject(user_id_violations(&user_id))?;

    let status = state
        .orchestrator
        .token_status(&user_id, BrokerKind::Mock.tag())
        .await?
        .ok_or_else(|| ApiError::NotFound("No token found for this user".to_string()))?;

    Ok(Json(TokenStatusResponse {
        success: true,
        status,
    }))
}
