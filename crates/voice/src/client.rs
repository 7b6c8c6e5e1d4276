//! HTTP client for the external STT/TTS voice microservice (spec §4.7).

use std::time::Duration;

use orch_domain::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SttResult {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

pub struct VoiceClient {
    http: reqwest::Client,
    base_url: String,
    stt_timeout: Duration,
    tts_timeout: Duration,
}

impl VoiceClient {
    pub fn new(base_url: impl Into<String>, stt_timeout_ms: u64, tts_timeout_ms: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            stt_timeout: Duration::from_millis(stt_timeout_ms),
            tts_timeout: Duration::from_millis(tts_timeout_ms),
        }
    }

    /// `POST /voice/stt` with the audio file as multipart. Empty
    /// transcription text is treated as `stt_failed` by the caller, not
    /// here — this layer only reports transport/decode failure.
    pub async fn speech_to_text(&self, audio_bytes: Vec<u8>, filename: &str) -> Result<SttResult> {
        let part = reqwest::multipart::Part::bytes(audio_bytes)
            .file_name(filename.to_string())
            .mime_str("audio/wav")
            .map_err(|e| stage_error("stt", e))?;
        let form = reqwest::multipart::Form::new().part("audio_file", part);

        let response = self
            .http
            .post(format!("{}/voice/stt", self.base_url))
            .multipart(form)
            .timeout(self.stt_timeout)
            .send()
            .await
            .map_err(|e| stage_error("stt", e))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VoiceStageFailed { stage: "stt".to_string(), message: body });
        }

        response.json::<SttResult>().await.map_err(|e| stage_error("stt", e))
    }

    /// `POST /voice/tts` followed by `GET /voice/audio/{id}`.
    pub async fn text_to_speech(&self, text: &str, voice_id: &str, language: &str) -> Result<Vec<u8>> {
        let body = serde_json::json!({"text": text, "voice_id": voice_id, "language": language});
        let response = self
            .http
            .post(format!("{}/voice/tts", self.base_url))
            .json(&body)
            .timeout(self.tts_timeout)
            .send()
            .await
            .map_err(|e| stage_error("tts", e))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VoiceStageFailed { stage: "tts".to_string(), message: body });
        }

        #[derive(Deserialize)]
        struct TtsResponse {
            audio_file_id: String,
        }
        let tts: TtsResponse = response.json().await.map_err(|e| stage_error("tts", e))?;

        let audio = self
            .http
            .get(format!("{}/voice/audio/{}", self.base_url, tts.audio_file_id))
            .timeout(self.tts_timeout)
            .send()
            .await
            .map_err(|e| stage_error("tts", e))?;
        if !audio.status().is_success() {
            return Err(Error::VoiceStageFailed { stage: "tts".to_string(), message: "audio download failed".to_string() });
        }
        Ok(audio.bytes().await.map_err(|e| stage_error("tts", e))?.to_vec())
    }
}

fn stage_error(stage: &str, error: impl std::fmt::Display) -> Error {
    Error::VoiceStageFailed { stage: stage.to_string(), message: error.to_string() }
}
