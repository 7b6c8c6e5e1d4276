// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Voice pipeline adapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::env_helpers::{env_bool, env_string, env_u64};

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Base URL of the external STT/TTS microservice, e.g. `http://voice:9000`.
    pub base_url: String,
    pub default_voice_id: String,
    pub default_language: String,
    pub audio_dir: String,
    pub stt_timeout_ms: u64,
    pub tts_timeout_ms: u64,
    /// How long generated response audio is retained before the background
    /// sweep deletes it.
    pub audio_retention_secs: u64,
}

impl VoiceConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_bool("VOICE_ENABLED", false),
            base_url: env_string("VOICE_SERVICE_URL", ""),
            default_voice_id: env_string("VOICE_DEFAULT_VOICE_ID", "default"),
            default_language: env_string("VOICE_DEFAULT_LANGUAGE", "en"),
            audio_dir: env_string("VOICE_AUDIO_DIR", "./voice_audio"),
            stt_timeout_ms: env_u64("VOICE_STT_TIMEOUT_MS", 30_000),
            tts_timeout_ms: env_u64("VOICE_TTS_TIMEOUT_MS", 30_000),
            audio_retention_secs: 3600,
        }
    }
}
