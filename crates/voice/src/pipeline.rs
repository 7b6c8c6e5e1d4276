//! Voice pipeline adapter (spec §4.7): STT → orchestrator → TTS.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use orch_domain::error::{Error, Result};
use orch_orchestrator::{CancelToken, Orchestrator, StreamEvent};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::client::VoiceClient;

#[derive(Debug, Clone, Serialize)]
pub struct VoiceResult {
    pub request_id: String,
    pub transcription: String,
    pub response_text: String,
    pub processing_time_ms: u64,
    pub stt_latency_ms: u64,
    pub orchestrator_latency_ms: u64,
    pub tts_latency_ms: u64,
}

/// Events emitted by the streaming variant (spec §4.7), interleaving
/// STT/TTS milestones with the orchestrator's own event stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum VoiceEvent {
    #[serde(rename = "voice_request_start")]
    VoiceRequestStart { request_id: String },
    #[serde(rename = "stt_start")]
    SttStart,
    #[serde(rename = "stt_complete")]
    SttComplete { text: String, latency_ms: u64 },
    #[serde(rename = "orchestrator_event")]
    OrchestratorEvent(StreamEvent),
    #[serde(rename = "tts_start")]
    TtsStart,
    #[serde(rename = "tts_complete")]
    TtsComplete { latency_ms: u64, audio_url: String },
    #[serde(rename = "voice_request_complete")]
    VoiceRequestComplete { processing_time_ms: u64 },
    #[serde(rename = "error")]
    Error { message: String },
}

pub struct VoicePipelineOptions<'a> {
    pub voice_id: &'a str,
    pub language: &'a str,
    pub conversation_id: Option<&'a str>,
}

/// Non-streaming `ProcessVoiceRequest` (spec §4.7).
pub async fn process_voice_request(
    client: &VoiceClient,
    orchestrator: &Orchestrator,
    audio_in: &Path,
    audio_out: &Path,
    options: VoicePipelineOptions<'_>,
) -> Result<VoiceResult> {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    let conversation_id = options.conversation_id.map(str::to_string).unwrap_or_else(|| request_id.clone());

    tracing::info!(request_id = %request_id, stage = "stt", "voice pipeline stage started");
    let stt_started = Instant::now();
    let audio_bytes = tokio::fs::read(audio_in).await?;
    let filename = audio_in.file_name().and_then(|n| n.to_str()).unwrap_or("audio.wav");
    let stt = client.speech_to_text(audio_bytes, filename).await?;
    if stt.text.trim().is_empty() {
        return Err(Error::VoiceStageFailed { stage: "stt".to_string(), message: "empty transcription".to_string() });
    }
    let stt_latency_ms = stt_started.elapsed().as_millis() as u64;

    tracing::info!(request_id = %request_id, stage = "orchestrator", "voice pipeline stage started");
    let orch_started = Instant::now();
    let final_state = orchestrator
        .process_request(&request_id, &stt.text, &conversation_id, CancelToken::new())
        .await?;
    let orchestrator_latency_ms = orch_started.elapsed().as_millis() as u64;

    tracing::info!(request_id = %request_id, stage = "tts", "voice pipeline stage started");
    let tts_started = Instant::now();
    let audio_data = client.text_to_speech(&final_state.response, options.voice_id, options.language).await?;
    tokio::fs::write(audio_out, &audio_data).await?;
    let tts_latency_ms = tts_started.elapsed().as_millis() as u64;

    Ok(VoiceResult {
        request_id,
        transcription: stt.text,
        response_text: final_state.response,
        processing_time_ms: started.elapsed().as_millis() as u64,
        stt_latency_ms,
        orchestrator_latency_ms,
        tts_latency_ms,
    })
}

/// Streaming variant. `cancel` is shared with the caller so an explicit
/// `{type:"interrupt"}` frame can abort the orchestrator and skip TTS
/// (spec §4.7). The synthesized response clip is written under
/// `audio_out_dir` and surfaced as a retrievable `audio_url` on
/// [`VoiceEvent::TtsComplete`], matching the non-streaming path's
/// `audio_url` field.
pub fn process_voice_request_stream(
    client: Arc<VoiceClient>,
    orchestrator: Arc<Orchestrator>,
    audio_bytes: Vec<u8>,
    filename: String,
    voice_id: String,
    language: String,
    conversation_id: Option<String>,
    cancel: CancelToken,
    audio_out_dir: Arc<PathBuf>,
) -> mpsc::Receiver<VoiceEvent> {
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let _ = tx.send(VoiceEvent::VoiceRequestStart { request_id: request_id.clone() }).await;

        let _ = tx.send(VoiceEvent::SttStart).await;
        let stt_started = Instant::now();
        let stt = match client.speech_to_text(audio_bytes, &filename).await {
            Ok(stt) if !stt.text.trim().is_empty() => stt,
            Ok(_) => {
                let _ = tx.send(VoiceEvent::Error { message: "stt_failed".to_string() }).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(VoiceEvent::Error { message: e.client_message().to_string() }).await;
                return;
            }
        };
        let _ = tx
            .send(VoiceEvent::SttComplete { text: stt.text.clone(), latency_ms: stt_started.elapsed().as_millis() as u64 })
            .await;

        let conversation_id = conversation_id.unwrap_or_else(|| request_id.clone());
        let mut orch_rx =
            orchestrator.process_request_stream(&request_id, &stt.text, &conversation_id, cancel.clone());
        let mut final_response = None;
        while let Some(event) = orch_rx.recv().await {
            if let StreamEvent::Final { ref content, .. } = event {
                final_response = Some(content.clone());
            }
            let is_terminal_error = matches!(event, StreamEvent::Error { .. } | StreamEvent::Cancelled);
            let _ = tx.send(VoiceEvent::OrchestratorEvent(event)).await;
            if is_terminal_error {
                return;
            }
        }

        let Some(response_text) = final_response else {
            let _ = tx.send(VoiceEvent::Error { message: "orchestrator produced no final response".to_string() }).await;
            return;
        };

        if cancel.is_cancelled() {
            return;
        }

        let _ = tx.send(VoiceEvent::TtsStart).await;
        let tts_started = Instant::now();
        match client.text_to_speech(&response_text, &voice_id, &language).await {
            Ok(audio) => {
                let out_filename = format!("{request_id}.wav");
                if let Err(e) = tokio::fs::write(audio_out_dir.join(&out_filename), &audio).await {
                    let _ = tx
                        .send(VoiceEvent::Error { message: format!("failed to write synthesized audio: {e}") })
                        .await;
                    return;
                }
                let _ = tx
                    .send(VoiceEvent::TtsComplete {
                        latency_ms: tts_started.elapsed().as_millis() as u64,
                        audio_url: format!("/api/voice/audio/{out_filename}"),
                    })
                    .await;
            }
            Err(e) => {
                let _ = tx.send(VoiceEvent::Error { message: e.client_message().to_string() }).await;
                return;
            }
        }

        let _ = tx
            .send(VoiceEvent::VoiceRequestComplete { processing_time_ms: started.elapsed().as_millis() as u64 })
            .await;
    });

    rx
}
