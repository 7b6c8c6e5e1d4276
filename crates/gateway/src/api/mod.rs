pub mod admin;
pub mod chat;
pub mod health;
pub mod voice;

use axum::error_handling::HandleErrorLayer;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceBuilder;

use crate::security;
use crate::state::AppState;

/// Build the full response body for an error, mirroring the teacher's
/// flat `{error, message}` JSON envelope.
pub fn error_response(status: u16, message: impl Into<String>) -> Response {
    let status = axum::http::StatusCode::from_u16(status).unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": status.as_str(), "message": message.into() }))).into_response()
}

/// Sliding-window rate-limit middleware (spec §4.2). Applied ahead of the
/// security-header layer so a 429 still carries `Retry-After` and the
/// standard header set.
async fn rate_limit_layer(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = security::extract_client_ip(request.headers(), &addr.ip().to_string());
    let path = request.uri().path().to_string();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;

    let decision = state.rate_limiter.check(&client_ip, &path, now).await;
    if !decision.allowed {
        let mut response = error_response(429, "rate limit exceeded");
        if let Some(retry_after) = decision.retry_after_secs {
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        return response;
    }

    next.run(request).await
}

/// Converts a shed-load rejection into the spec §5 503, and anything else
/// `tower`'s middleware stack can produce into a generic 500 — axum
/// requires every layered service to be infallible, so this is the seam
/// where `tower::BoxError` becomes a real response.
async fn handle_overload(error: tower::BoxError) -> Response {
    if error.is::<tower::load_shed::error::Overloaded>() {
        error_response(503, "server overloaded, try again shortly")
    } else {
        error_response(500, format!("unhandled middleware error: {error}"))
    }
}

/// The full gateway surface (spec §6). Every route carries the security
/// header and rate-limit layers; CORS is applied once at the top.
///
/// `max_concurrent_requests` is enforced by shedding, not queuing (spec
/// §5: "rejects new work with 503 when saturated") — `LoadShedLayer`
/// turns the concurrency limiter's backpressure into an immediate 503
/// instead of letting requests pile up waiting for a slot.
pub fn router(state: AppState) -> Router {
    let cors = security::build_cors_layer(&state.config.server.cors_allowed_origins);
    let max_concurrent = state.config.server.max_concurrent_requests;

    let load_shedding = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_overload))
        .load_shed()
        .concurrency_limit(max_concurrent);

    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/ws/chat", get(chat::ws_chat))
        .route("/api/voice/chat", post(voice::voice_chat))
        .route("/api/voice/audio/:filename", get(voice::voice_audio))
        .route("/ws/voice", get(voice::ws_voice))
        .route("/health", get(health::health))
        .route("/api/models", get(admin::list_models))
        .route("/api/admin/agents", get(admin::list_agents))
        .route("/api/admin/budgets/:agent_id", get(admin::agent_budget))
        .layer(middleware::from_fn_with_state(state.clone(), security::security_headers_layer))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_layer))
        .layer(middleware::from_fn_with_state(state.clone(), security::validation_layer))
        .layer(load_shedding)
        .layer(cors)
        .with_state(state)
}
