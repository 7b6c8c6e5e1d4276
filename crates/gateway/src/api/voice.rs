//! `POST /api/voice/chat`, `GET /api/voice/audio/{filename}`, `/ws/voice`
//! (spec §4.7, §6).

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Multipart, Path, State, WebSocketUpgrade};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use orch_orchestrator::CancelToken;
use orch_voice::{process_voice_request, process_voice_request_stream, VoicePipelineOptions};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error_response;
use crate::state::AppState;

/// Rejects filenames whose extension is on the configured blocklist
/// (spec §4.3). Uploads with no recognizable extension are let through —
/// the blocklist guards against disguised executables, not missing
/// metadata.
fn rejects_blocked_extension(config: &orch_domain::config::ValidationConfig, filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    match lower.rfind('.') {
        Some(idx) => config.blocked_file_extensions.contains(&lower[idx..]),
        None => false,
    }
}

/// `POST /api/voice/chat`: multipart `audio` file plus optional
/// `conversation_id` and `voice_id` fields.
pub async fn voice_chat(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let Some(voice_client) = state.voice_client.clone() else {
        return error_response(503, "voice pipeline is disabled");
    };

    let mut audio_bytes: Option<Bytes> = None;
    let mut conversation_id: Option<String> = None;
    let mut voice_id: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(400, format!("malformed multipart body: {e}")),
        };
        match field.name().unwrap_or("") {
            "audio" => {
                if let Some(filename) = field.file_name() {
                    if rejects_blocked_extension(&state.config.validation, filename) {
                        return error_response(400, "uploaded file extension is not allowed");
                    }
                }
                match field.bytes().await {
                    Ok(bytes) => audio_bytes = Some(bytes),
                    Err(e) => return error_response(400, format!("failed to read audio field: {e}")),
                }
            }
            "conversation_id" => conversation_id = field.text().await.ok(),
            "voice_id" => voice_id = field.text().await.ok(),
            _ => {}
        }
    }

    let Some(audio_bytes) = audio_bytes else {
        return error_response(400, "multipart body must include an 'audio' field");
    };

    let request_id = Uuid::new_v4().to_string();
    let in_path = state.voice_audio_dir.join(format!("{request_id}-in.wav"));
    let out_path = state.voice_audio_dir.join(format!("{request_id}.wav"));
    if let Err(e) = tokio::fs::write(&in_path, &audio_bytes).await {
        return error_response(500, format!("failed to stage uploaded audio: {e}"));
    }

    let voice_id = voice_id.unwrap_or_else(|| state.config.voice.default_voice_id.clone());
    let language = state.config.voice.default_language.clone();

    let result = process_voice_request(
        &voice_client,
        &state.orchestrator,
        &in_path,
        &out_path,
        VoicePipelineOptions { voice_id: &voice_id, language: &language, conversation_id: conversation_id.as_deref() },
    )
    .await;
    let _ = tokio::fs::remove_file(&in_path).await;

    match result {
        Ok(r) => Json(json!({
            "success": true,
            "request_id": r.request_id,
            "transcription": r.transcription,
            "response_text": r.response_text,
            "audio_url": format!("/api/voice/audio/{}", out_path.file_name().and_then(|n| n.to_str()).unwrap_or("")),
            "processing_time": r.processing_time_ms,
            "error": Value::Null,
            "metadata": {
                "stt_latency_ms": r.stt_latency_ms,
                "orchestrator_latency_ms": r.orchestrator_latency_ms,
                "tts_latency_ms": r.tts_latency_ms,
            },
        }))
        .into_response(),
        Err(e) => Json(json!({
            "success": false,
            "request_id": request_id,
            "transcription": Value::Null,
            "response_text": Value::Null,
            "audio_url": Value::Null,
            "processing_time": 0,
            "error": e.client_message(),
            "metadata": {},
        }))
        .into_response(),
    }
}

/// `GET /api/voice/audio/{filename}`: serves a generated response clip.
/// Filenames are server-issued UUIDs; no path component beyond the bare
/// filename is accepted, which rules out traversal.
pub async fn voice_audio(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    if filename.contains('/') || filename.contains("..") {
        return error_response(400, "invalid filename");
    }
    let path = state.voice_audio_dir.join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "audio/wav"), (header::CACHE_CONTROL, "private, max-age=3600")],
            bytes,
        )
            .into_response(),
        Err(_) => error_response(404, "audio not found"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum VoiceClientFrame {
    VoiceInput { audio_data: String, #[serde(default)] format: Option<String>, #[serde(default)] conversation_id: Option<String> },
    Interrupt,
}

/// `GET /ws/voice`: base64-framed audio in, [`orch_voice::VoiceEvent`]
/// frames out.
pub async fn ws_voice(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_ws_voice(socket, state))
}

async fn handle_ws_voice(mut socket: WebSocket, state: AppState) {
    let Some(voice_client) = state.voice_client.clone() else {
        let _ = socket
            .send(Message::Text(json!({"type": "error", "message": "voice pipeline is disabled"}).to_string()))
            .await;
        return;
    };

    let cancel = CancelToken::new();

    loop {
        let Some(Ok(msg)) = socket.recv().await else { break };
        let Message::Text(text) = msg else { continue };

        let frame: VoiceClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(_) => continue,
        };

        match frame {
            VoiceClientFrame::Interrupt => {
                cancel.cancel();
            }
            VoiceClientFrame::VoiceInput { audio_data, format, conversation_id } => {
                let audio_bytes = match BASE64.decode(audio_data.as_bytes()) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = socket
                            .send(Message::Text(json!({"type": "error", "message": format!("invalid base64 audio: {e}")}).to_string()))
                            .await;
                        continue;
                    }
                };
                let filename = format!("input.{}", format.unwrap_or_else(|| "wav".to_string()));
                if rejects_blocked_extension(&state.config.validation, &filename) {
                    let _ = socket
                        .send(Message::Text(json!({"type": "error", "message": "audio format is not allowed"}).to_string()))
                        .await;
                    continue;
                }
                let mut rx = process_voice_request_stream(
                    voice_client.clone(),
                    state.orchestrator.clone(),
                    audio_bytes,
                    filename,
                    state.config.voice.default_voice_id.clone(),
                    state.config.voice.default_language.clone(),
                    conversation_id,
                    cancel.clone(),
                    state.voice_audio_dir.clone(),
                );
                while let Some(event) = rx.recv().await {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
