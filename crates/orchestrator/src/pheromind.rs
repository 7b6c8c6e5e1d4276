//! PheromindScan (spec §4.6): a bounded, best-effort read against an
//! ambient-signal store keyed by conversation fingerprint.

use std::sync::Arc;

use orch_kv::KvStore;

fn signal_key(conversation_id: &str) -> String {
    format!("pheromind:{conversation_id}")
}

/// Scan for up to `max_signals` recent signals. KV unavailability degrades
/// to an empty set rather than failing the phase (spec §4.6).
pub async fn scan(kv: &Arc<dyn KvStore>, conversation_id: &str, max_signals: usize) -> Vec<String> {
    match kv.recent(&signal_key(conversation_id), max_signals).await {
        Ok(signals) => signals,
        Err(e) => {
            tracing::warn!(conversation_id, error = %e, "pheromind scan degraded: KV unavailable");
            Vec::new()
        }
    }
}

/// Record a signal for future scans against this conversation. Best-effort:
/// errors are logged and otherwise ignored, matching the phase's own
/// degraded-on-failure posture.
pub async fn record(kv: &Arc<dyn KvStore>, conversation_id: &str, signal: &str, ttl_secs: u64) {
    if let Err(e) = kv.push_with_ttl(&signal_key(conversation_id), signal, ttl_secs).await {
        tracing::warn!(conversation_id, error = %e, "failed to record pheromind signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_kv::InMemoryKv;

    #[tokio::test]
    async fn records_and_scans_back_the_same_signal() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKv::new());
        record(&kv, "conv-1", "user asked about pricing", 60).await;
        let signals = scan(&kv, "conv-1", 20).await;
        assert_eq!(signals, vec!["user asked about pricing".to_string()]);
    }

    #[tokio::test]
    async fn scan_on_empty_conversation_returns_empty() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKv::new());
        let signals = scan(&kv, "conv-none", 20).await;
        assert!(signals.is_empty());
    }
}
