use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

use orch_domain::config::{Config, ConfigSeverity};
use orch_gateway::api;
use orch_gateway::state::AppState;
use orch_gateway::tools;
use orch_kip::KipExecutor;
use orch_kv::{InMemoryKv, KvStore, RedisKv};
use orch_orchestrator::Orchestrator;
use orch_providers::{ModelRegistry, ModelRouter, RouterStartupPolicy};
use orch_ratelimit::RateLimiter;
use orch_treasury::Treasury;
use orch_validate::Validator;
use orch_voice::VoiceClient;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,orch_gateway=debug")))
        .json()
        .init();
}

async fn connect_kv(config: &Config) -> Arc<dyn KvStore> {
    match RedisKv::connect(&config.rate_limit.redis_host, config.rate_limit.redis_port).await {
        Ok(kv) => {
            tracing::info!(host = %config.rate_limit.redis_host, port = config.rate_limit.redis_port, "connected to redis");
            Arc::new(kv)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "redis unavailable at startup, falling back to an in-process KV store — rate limits and pheromind signals will not survive a restart and are not shared across instances"
            );
            Arc::new(InMemoryKv::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Arc::new(Config::from_env());
    run_server(config).await
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("orchestrator gateway starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    // ── KV store (rate limiter, pheromind signals) ──────────────────
    let kv = connect_kv(&config).await;

    // ── Model registry + router ──────────────────────────────────────
    let registry = ModelRegistry::from_config(&config.router, RouterStartupPolicy::RequireOne)
        .context("initializing model registry")?;
    tracing::info!(aliases = registry.list_aliases().len(), "model registry ready");
    let model_router = Arc::new(ModelRouter::with_concurrency_limit(
        registry,
        config.router.default_timeout_ms,
        config.router.health_check_timeout_ms,
        config.router.max_concurrent_per_alias,
    ));

    // ── Treasury ──────────────────────────────────────────────────────
    let treasury = Arc::new(Treasury::new(
        config.treasury.default_seed_cents,
        config.treasury.default_daily_limit_cents,
        config.treasury.default_per_action_limit_cents,
        kv.clone(),
        config.treasury.budget_cache_ttl_secs,
    ));
    tracing::info!("treasury ready");

    // ── KIP tool registry + executor ─────────────────────────────────
    let kip_registry = tools::load_catalog(&config.kip.tool_catalog_path);
    let kip_executor = Arc::new(KipExecutor::new(kip_registry, config.kip.quota_retention_days, Some(treasury.clone())));
    tracing::info!("kip executor ready");

    // ── Orchestrator ──────────────────────────────────────────────────
    let orchestrator = Arc::new(Orchestrator::new(
        model_router.clone(),
        kv.clone(),
        Some(kip_executor),
        config.router.clone(),
        config.orchestrator.clone(),
    ));
    tracing::info!("orchestrator ready");

    // ── Voice pipeline adapter ────────────────────────────────────────
    let voice_audio_dir = std::path::PathBuf::from(&config.voice.audio_dir);
    std::fs::create_dir_all(&voice_audio_dir)
        .with_context(|| format!("creating voice audio dir {}", voice_audio_dir.display()))?;
    let voice_client = if config.voice.enabled {
        tracing::info!(base_url = %config.voice.base_url, "voice pipeline enabled");
        Some(Arc::new(VoiceClient::new(
            config.voice.base_url.clone(),
            config.voice.stt_timeout_ms,
            config.voice.tts_timeout_ms,
        )))
    } else {
        tracing::info!("voice pipeline disabled");
        None
    };

    // ── Rate limiter + validator ─────────────────────────────────────
    let rate_limiter = Arc::new(RateLimiter::new(kv.clone(), config.rate_limit.clone()));
    let validator = Arc::new(Validator::new(config.validation.clone()));

    // ── Admin token (read once, hash for constant-time comparison) ───
    let admin_token_hash = match config.server.admin_token_env_value() {
        Some(token) if !token.is_empty() => {
            tracing::info!("admin bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!("admin bearer-token auth DISABLED — set the configured admin token env var to enable");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        orchestrator,
        kv,
        model_router,
        treasury,
        rate_limiter,
        validator,
        voice_client,
        voice_audio_dir: Arc::new(voice_audio_dir),
        admin_token_hash,
        started_at: Instant::now(),
    };

    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}
