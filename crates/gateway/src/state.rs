use std::sync::Arc;
use std::time::Instant;

use orch_domain::config::Config;
use orch_kv::KvStore;
use orch_orchestrator::Orchestrator;
use orch_providers::ModelRouter;
use orch_ratelimit::RateLimiter;
use orch_treasury::Treasury;
use orch_validate::Validator;
use orch_voice::VoiceClient;

/// Shared application state passed to every API handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
    /// Kept alongside `orchestrator` (which owns its own clone) so
    /// `/health` can probe the KV backend without going through a full
    /// request cycle.
    pub kv: Arc<dyn KvStore>,
    /// Kept alongside `orchestrator` for the same reason: `/health` and
    /// `/api/models` need read access to backend health and aliases.
    pub model_router: Arc<ModelRouter>,
    pub treasury: Arc<Treasury>,
    pub rate_limiter: Arc<RateLimiter>,
    pub validator: Arc<Validator>,
    /// `None` when `voice.enabled` is false; the voice endpoints return
    /// 503 in that case rather than requiring a dummy client.
    pub voice_client: Option<Arc<VoiceClient>>,
    pub voice_audio_dir: Arc<std::path::PathBuf>,
    /// SHA-256 hash of the admin bearer token. `None` disables admin auth
    /// (dev mode), matching the orchestrator's own "config warns, doesn't
    /// fail startup" posture for optional secrets.
    pub admin_token_hash: Option<Vec<u8>>,
    /// Process start, for `/health`'s `uptime_seconds`.
    pub started_at: Instant,
}
