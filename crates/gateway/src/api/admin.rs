//! Introspection-only admin endpoints (spec §6): `GET /api/admin/agents`,
//! `GET /api/admin/budgets/{agent_id}`, `GET /api/models`.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::api::error_response;
use crate::state::AppState;

/// Bearer-token extractor. Uses SHA-256 + constant-time comparison so a
/// mismatched token can't be distinguished by response latency. With no
/// `admin_token_hash` configured the gateway is in dev mode and every
/// request passes.
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected_hash) = &state.admin_token_hash else {
            return Ok(AdminGuard);
        };

        let provided = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");

        let provided_hash = Sha256::digest(provided.as_bytes());
        if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
            return Err((StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": "invalid admin token" }))).into_response());
        }
        Ok(AdminGuard)
    }
}

/// `GET /api/admin/agents`: every agent with a budget, plus its frozen
/// and daily-spend status. Introspection only, not part of the core
/// request path.
pub async fn list_agents(_guard: AdminGuard, State(state): State<AppState>) -> Response {
    let mut agents = Vec::new();
    for id in state.treasury.known_agent_ids() {
        if let Some(budget) = state.treasury.get_budget(&id).await {
            agents.push(budget);
        }
    }
    Json(serde_json::json!({ "agents": agents })).into_response()
}

/// `GET /api/admin/budgets/{agent_id}`: one agent's budget and its
/// transaction history, newest first.
pub async fn agent_budget(_guard: AdminGuard, State(state): State<AppState>, Path(agent_id): Path<String>) -> Response {
    let Some(budget) = state.treasury.get_budget(&agent_id).await else {
        return error_response(404, format!("no budget for agent '{agent_id}'"));
    };
    let mut transactions = state.treasury.transactions_for(&agent_id);
    transactions.reverse();
    Json(serde_json::json!({ "budget": budget, "transactions": transactions })).into_response()
}

/// `GET /api/models`: the configured aliases, without exposing backend
/// hosts or credentials.
pub async fn list_models(_guard: AdminGuard, State(state): State<AppState>) -> Response {
    let aliases = state.model_router.registry().list_aliases();
    Json(serde_json::json!({ "aliases": aliases })).into_response()
}
