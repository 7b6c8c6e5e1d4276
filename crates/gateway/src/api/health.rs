//! `GET /health` (spec §6): aggregate status across the services the
//! gateway depends on.

use axum::extract::State;
use axum::response::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Healthy,
    Degraded,
    Unhealthy,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Status::Healthy => "healthy",
            Status::Degraded => "degraded",
            Status::Unhealthy => "unhealthy",
        }
    }

    fn worst(self, other: Status) -> Status {
        use Status::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }
}

async fn check_kv(state: &AppState) -> (Status, String) {
    match state.kv.get_string("health:ping").await {
        Ok(_) => (Status::Healthy, "ok".to_string()),
        Err(e) => (Status::Degraded, e.client_message().to_string()),
    }
}

async fn check_router(state: &AppState) -> (Status, String) {
    let aliases = state.config.router.aliases.keys().cloned().collect::<Vec<_>>();
    if aliases.is_empty() {
        return (Status::Unhealthy, "no model aliases configured".to_string());
    }
    let mut healthy = 0usize;
    for alias in &aliases {
        if state.model_router.health_check(alias).await {
            healthy += 1;
        }
    }
    if healthy == aliases.len() {
        (Status::Healthy, format!("{healthy}/{} backends reachable", aliases.len()))
    } else if healthy > 0 {
        (Status::Degraded, format!("{healthy}/{} backends reachable", aliases.len()))
    } else {
        (Status::Unhealthy, "no backends reachable".to_string())
    }
}

fn check_treasury(state: &AppState) -> (Status, String) {
    if state.treasury.is_emergency_active() {
        (Status::Degraded, "emergency freeze active".to_string())
    } else {
        (Status::Healthy, "ok".to_string())
    }
}

fn check_voice(state: &AppState) -> (Status, String) {
    if state.config.voice.enabled {
        if state.voice_client.is_some() {
            (Status::Healthy, "enabled".to_string())
        } else {
            (Status::Unhealthy, "enabled in config but client failed to initialize".to_string())
        }
    } else {
        (Status::Healthy, "disabled".to_string())
    }
}

/// `GET /health`. Loopback callers bypass rate limiting (spec §4.2); this
/// handler itself never errors, it always reports a status.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let (kv_status, kv_message) = check_kv(&state).await;
    let (router_status, router_message) = check_router(&state).await;
    let (treasury_status, treasury_message) = check_treasury(&state);
    let (voice_status, voice_message) = check_voice(&state);

    let overall = kv_status.worst(router_status).worst(treasury_status).worst(voice_status);
    let now = Utc::now();

    let service = |status: Status, message: String| {
        json!({ "status": status.as_str(), "message": message, "checked_at": now.to_rfc3339() })
    };

    Json(json!({
        "status": overall.as_str(),
        "timestamp": now.to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "services": {
            "kv": service(kv_status, kv_message),
            "model_router": service(router_status, router_message),
            "treasury": service(treasury_status, treasury_message),
            "voice": service(voice_status, voice_message),
        },
    }))
}
