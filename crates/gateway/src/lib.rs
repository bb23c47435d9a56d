//! HTTP gateway for QuotaRelay.
//!
//! - `GET /`: HTML status dashboard
//! - `GET /api/usage`: the same numbers as JSON
//! - `GET /health`: liveness
//! - `POST /webhook`: relay one chat turn
//!
//! Built on Axum.

pub mod dashboard;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use quotarelay_config::AppConfig;
use quotarelay_core::UserId;
use quotarelay_memory::Repository;
use quotarelay_relay::{Failure, Refusal, Relay, TurnError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::dashboard::UsageView;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub relay: Arc<Relay>,
    pub repository: Arc<Repository>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/usage", get(usage_handler))
        .route("/health", get(health_handler))
        .route("/webhook", post(webhook_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the gateway until the process is stopped.
pub async fn start(state: GatewayState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", state.config.gateway.host, state.config.gateway.port);
    let app = build_router(Arc::new(state));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn usage_view(state: &GatewayState) -> UsageView {
    UsageView::new(
        &state.relay.current_usage_snapshot(),
        state.relay.policy(),
        state.relay.sessions().active_sessions(),
    )
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn dashboard_handler(State(state): State<SharedState>) -> Html<String> {
    Html(dashboard::render(&usage_view(&state)))
}

async fn usage_handler(State(state): State<SharedState>) -> Json<UsageView> {
    Json(usage_view(&state))
}

/// Chat platforms send numeric ids, web callers strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireUserId {
    Number(u64),
    Text(String),
}

impl From<WireUserId> for UserId {
    fn from(id: WireUserId) -> Self {
        match id {
            WireUserId::Number(n) => UserId::from(n),
            WireUserId::Text(s) => UserId::from(s),
        }
    }
}

#[derive(Deserialize)]
struct WebhookRequest {
    user_id: WireUserId,
    message: String,
}

#[derive(Serialize)]
struct WebhookUsage {
    prompt: u64,
    completion: u64,
    total: u64,
    daily_total: u64,
    lifetime_total: u64,
}

#[derive(Serialize)]
struct WebhookResponse {
    response: String,
    model: String,
    warning: Option<String>,
    usage: WebhookUsage,
    /// Only present for configured admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    usage_summary: Option<String>,
}

#[derive(Serialize)]
struct WebhookError {
    error: &'static str,
    message: &'static str,
}

fn error_status(err: &TurnError) -> StatusCode {
    match err {
        TurnError::Refusal(Refusal::QuotaExceeded) => StatusCode::TOO_MANY_REQUESTS,
        TurnError::Refusal(Refusal::EmptyModelResponse) => StatusCode::BAD_GATEWAY,
        TurnError::Failure(Failure::MissingCredential(_)) => StatusCode::SERVICE_UNAVAILABLE,
        TurnError::Failure(Failure::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
        TurnError::Failure(Failure::Provider(_)) => StatusCode::BAD_GATEWAY,
        TurnError::Failure(Failure::Unexpected(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn webhook_handler(
    State(state): State<SharedState>,
    Json(payload): Json<WebhookRequest>,
) -> Response {
    let prompt = payload.message.trim();
    if prompt.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(WebhookError {
                error: "empty_message",
                message: "Message must not be empty.",
            }),
        )
            .into_response();
    }

    let user = UserId::from(payload.user_id);
    info!(user = %user, message_len = prompt.len(), "Webhook message received");

    let context = state
        .repository
        .latest_entries(state.config.repository.context_limit)
        .await;

    match state.relay.handle_turn(&user, prompt, &context).await {
        Ok(turn) => {
            let usage_summary = state
                .config
                .is_admin(user.as_str())
                .then(|| turn.compact_usage());
            Json(WebhookResponse {
                usage: WebhookUsage {
                    prompt: turn.usage.prompt,
                    completion: turn.usage.completion,
                    total: turn.usage.total,
                    daily_total: turn.snapshot.epoch_tokens(),
                    lifetime_total: turn.snapshot.lifetime_tokens(),
                },
                response: turn.reply,
                model: turn.model,
                warning: turn.warning,
                usage_summary,
            })
            .into_response()
        }
        Err(e) => {
            if matches!(e, TurnError::Failure(Failure::Unexpected(_))) {
                tracing::error!(user = %user, error = %e, "Turn failed unexpectedly");
            }
            (
                error_status(&e),
                Json(WebhookError {
                    error: e.reason(),
                    message: e.user_message(),
                }),
            )
                .into_response()
        }
    }
}
