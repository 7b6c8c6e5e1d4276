//! Model router (spec §4.1): alias resolution plus a chat-completion-style
//! HTTP client against local inference hosts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use orch_domain::error::{Error, Result};
use orch_domain::trace::TraceEvent;
use serde_json::json;
use tokio::sync::Semaphore;

use crate::registry::ModelRegistry;
use crate::traits::{GenerateOptions, GenerateResult, Usage};

const SENTINEL_PREFIX: &str = "<|channel|>";
const SENTINEL_MARKER: &str = "<|message|>";

pub struct ModelRouter {
    registry: ModelRegistry,
    http: reqwest::Client,
    default_timeout_ms: u64,
    health_check_timeout_ms: u64,
    /// One semaphore per configured alias, sized to
    /// `RouterConfig::max_concurrent_per_alias` — caps fan-out to a single
    /// backend regardless of how many callers (council members, retries)
    /// target it concurrently.
    alias_limits: HashMap<String, Semaphore>,
}

impl ModelRouter {
    pub fn new(registry: ModelRegistry, default_timeout_ms: u64, health_check_timeout_ms: u64) -> Self {
        Self::with_concurrency_limit(registry, default_timeout_ms, health_check_timeout_ms, usize::MAX)
    }

    pub fn with_concurrency_limit(
        registry: ModelRegistry,
        default_timeout_ms: u64,
        health_check_timeout_ms: u64,
        max_concurrent_per_alias: usize,
    ) -> Self {
        let alias_limits = registry
            .list_aliases()
            .into_iter()
            .map(|alias| (alias, Semaphore::new(max_concurrent_per_alias)))
            .collect();
        Self {
            registry,
            http: reqwest::Client::new(),
            default_timeout_ms,
            health_check_timeout_ms,
            alias_limits,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// `Generate(alias, prompt, options)` (spec §4.1). Failures are not
    /// retried here — the orchestrator decides whether to fall back.
    pub async fn generate(&self, request_id: &str, alias: &str, prompt: &str, options: &GenerateOptions) -> Result<GenerateResult> {
        let descriptor = self
            .registry
            .resolve(alias)
            .ok_or_else(|| Error::Config(format!("unknown model alias '{alias}'")))?;

        // Acquiring here (rather than around the whole call) means the
        // permit is held only across the actual backend request below.
        let _permit = match self.alias_limits.get(alias) {
            Some(semaphore) => Some(
                semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::Config(format!("alias '{alias}' semaphore closed")))?,
            ),
            None => None,
        };

        let url = format!("http://{}:{}/v1/chat/completions", descriptor.host, descriptor.port);
        let body = json!({
            "model": alias,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "top_p": options.top_p,
            "top_k": options.top_k,
            "stream": options.stream,
        });

        TraceEvent::LlmRequest {
            request_id: request_id.to_string(),
            alias: alias.to_string(),
            role: "generate".to_string(),
        }
        .emit();

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(Duration::from_millis(self.default_timeout_ms))
            .send()
            .await
            .map_err(|e| map_transport_error(alias, self.default_timeout_ms, &e))?;

        let status = response.status();
        if !status.is_success() {
            let snippet: String = response.text().await.unwrap_or_default().chars().take(500).collect();
            return Err(Error::BackendError {
                alias: alias.to_string(),
                status: status.as_u16(),
                body_snippet: snippet,
            });
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| Error::BackendError {
            alias: alias.to_string(),
            status: status.as_u16(),
            body_snippet: format!("invalid JSON body: {e}"),
        })?;

        let choice = payload
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first());
        let Some(choice) = choice else {
            return Err(Error::BackendError {
                alias: alias.to_string(),
                status: status.as_u16(),
                body_snippet: "no choices".to_string(),
            });
        };

        let raw_content = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        let content = strip_sentinel(raw_content);
        let finish_reason = choice.get("finish_reason").and_then(|f| f.as_str()).map(str::to_string);

        let usage = payload
            .get("usage")
            .and_then(|u| {
                let prompt_tokens = u.get("prompt_tokens").and_then(|v| v.as_u64())? as u32;
                let completion_tokens = u.get("completion_tokens").and_then(|v| v.as_u64()).map(|v| v as u32);
                Some(Usage { prompt_tokens, completion_tokens })
            })
            .or_else(|| {
                Some(Usage {
                    prompt_tokens: prompt.split_whitespace().count() as u32,
                    completion_tokens: None,
                })
            });

        Ok(GenerateResult {
            content,
            model: alias.to_string(),
            usage,
            finish_reason,
        })
    }

    /// `HealthCheck(alias)` (spec §4.1): a cheap GET, success status = healthy.
    pub async fn health_check(&self, alias: &str) -> bool {
        let Some(descriptor) = self.registry.resolve(alias) else {
            return false;
        };
        let url = format!("http://{}:{}/health", descriptor.host, descriptor.port);
        self.http
            .get(&url)
            .timeout(Duration::from_millis(self.health_check_timeout_ms))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Timed variant used by the orchestrator's startup probe to log
    /// latency alongside the boolean result.
    pub async fn health_check_timed(&self, alias: &str) -> (bool, Duration) {
        let start = Instant::now();
        let healthy = self.health_check(alias).await;
        (healthy, start.elapsed())
    }
}

/// Strip a leading `<|channel|>…<|message|>` sentinel, keeping only the
/// text after the last `<|message|>` marker (spec §4.1).
fn strip_sentinel(text: &str) -> String {
    if !text.starts_with(SENTINEL_PREFIX) {
        return text.to_string();
    }
    match text.rfind(SENTINEL_MARKER) {
        Some(idx) => text[idx + SENTINEL_MARKER.len()..].to_string(),
        None => text.to_string(),
    }
}

fn map_transport_error(alias: &str, timeout_ms: u64, error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::BackendTimeout {
            alias: alias.to_string(),
            timeout_ms,
        }
    } else {
        Error::BackendUnavailable {
            alias: alias.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sentinel_keeping_text_after_last_marker() {
        let raw = "<|channel|>analysis<|message|>the real answer";
        assert_eq!(strip_sentinel(raw), "the real answer");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        let raw = "a perfectly ordinary answer";
        assert_eq!(strip_sentinel(raw), raw);
    }

    #[test]
    fn only_strips_when_prefixed_by_sentinel() {
        let raw = "some text with <|message|> inside but no leading sentinel";
        assert_eq!(strip_sentinel(raw), raw);
    }
}
