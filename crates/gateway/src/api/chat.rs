//! `POST /api/chat` and `/ws/chat` (spec §6).

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Json};
use orch_orchestrator::{CancelToken, StreamEvent};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::api::error_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// `POST /api/chat` (spec §6, non-streaming).
pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> axum::response::Response {
    if body.message.is_empty() || body.message.chars().count() > 8000 {
        return error_response(
            400,
            "message must be 1-8000 characters",
        );
    }
    if let Err(reason) = state.validator.scan_str(&body.message) {
        return error_response(state.validator.to_error("unknown", "/api/chat", reason).status_code(), "invalid input detected");
    }

    let request_id = Uuid::new_v4().to_string();
    let conversation_id = body.conversation_id.clone().unwrap_or_else(|| request_id.clone());

    match state
        .orchestrator
        .process_request(&request_id, &body.message, &conversation_id, CancelToken::new())
        .await
    {
        Ok(final_state) => Json(json!({
            "response": final_state.response,
            "intent": final_state.intent,
            "processing_time": final_state.processing_time_ms,
            "path_taken": final_state.path_taken,
        }))
        .into_response(),
        Err(e) => error_response(e.status_code(), e.client_message()),
    }
}

/// `GET /ws/chat` (spec §6). The client sends `{message, conversation_id?}`
/// frames; the server streams [`StreamEvent`] JSON. A `{type:"interrupt"}`
/// frame cancels the in-flight request.
pub async fn ws_chat(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    let client_ip = addr.ip().to_string();
    if !state.rate_limiter.try_admit_websocket(&client_ip) {
        return (axum::http::StatusCode::TOO_MANY_REQUESTS, "too many websocket connections from this IP")
            .into_response();
    }
    ws.on_upgrade(move |socket| handle_ws_chat(socket, state, client_ip))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientFrame {
    Interrupt { #[serde(rename = "type")] kind: String },
    Message(ChatRequest),
}

async fn handle_ws_chat(mut socket: WebSocket, state: AppState, client_ip: String) {
    let cancel = CancelToken::new();

    loop {
        let Some(Ok(msg)) = socket.recv().await else { break };
        let Message::Text(text) = msg else { continue };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(_) => continue,
        };

        match frame {
            ClientFrame::Interrupt { kind } if kind == "interrupt" => {
                cancel.cancel();
                continue;
            }
            ClientFrame::Interrupt { .. } => continue,
            ClientFrame::Message(request) => {
                if request.message.is_empty() || request.message.chars().count() > 8000 {
                    let _ = socket
                        .send(Message::Text(json!({"type": "error", "message": "message must be 1-8000 characters"}).to_string()))
                        .await;
                    continue;
                }
                if let Err(reason) = state.validator.scan_str(&request.message) {
                    let _ = state.validator.to_error(&client_ip, "/ws/chat", reason);
                    let _ = socket
                        .send(Message::Text(json!({"type": "error", "message": "invalid input detected"}).to_string()))
                        .await;
                    continue;
                }

                let request_id = Uuid::new_v4().to_string();
                let conversation_id = request.conversation_id.unwrap_or_else(|| request_id.clone());
                let mut rx = state.orchestrator.process_request_stream(
                    &request_id,
                    &request.message,
                    &conversation_id,
                    cancel.clone(),
                );
                while let Some(event) = rx.recv().await {
                    let is_terminal = matches!(event, StreamEvent::Final { .. } | StreamEvent::Error { .. } | StreamEvent::Cancelled);
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                    if is_terminal {
                        break;
                    }
                }
            }
        }
    }

    state.rate_limiter.release_websocket(&client_ip);
}
