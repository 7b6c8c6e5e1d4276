//! CouncilDeliberation (spec §4.6): parallel council calls with a
//! partial-quorum early-exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use orch_domain::trace::TraceEvent;
use orch_providers::ModelRouter;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize)]
pub struct CouncilPosition {
    pub model_alias: String,
    pub answer: String,
    pub latency_ms: u64,
}

pub enum CouncilOutcome {
    /// At least one council member answered.
    Positions(Vec<CouncilPosition>),
    /// Every council member failed or timed out.
    Unavailable,
}

/// `ceil(N/2)+1` out of `total` (spec §4.6).
pub fn quorum_threshold(total: usize) -> usize {
    (total.div_ceil(2)) + 1
}

/// Invoke every council alias in parallel, returning as soon as quorum is
/// reached, all calls complete, or the deadline elapses — whichever first.
/// Timed-out or failed calls contribute nothing to the result.
pub async fn deliberate(
    request_id: &str,
    router: &Arc<ModelRouter>,
    aliases: &[String],
    prompt: &str,
    deadline: Duration,
) -> CouncilOutcome {
    let total = aliases.len();
    let quorum = quorum_threshold(total).min(total.max(1));
    let (tx, mut rx) = mpsc::channel::<Option<CouncilPosition>>(total.max(1));

    for alias in aliases {
        let tx = tx.clone();
        let router = Arc::clone(router);
        let alias = alias.clone();
        let prompt = prompt.to_string();
        let request_id = request_id.to_string();
        tokio::spawn(async move {
            let start = Instant::now();
            let options = orch_providers::GenerateOptions::default();
            let result = router.generate(&request_id, &alias, &prompt, &options).await;
            let position = result.ok().map(|r| CouncilPosition {
                model_alias: alias,
                answer: r.content,
                latency_ms: start.elapsed().as_millis() as u64,
            });
            let _ = tx.send(position).await;
        });
    }
    drop(tx);

    let mut positions = Vec::new();
    let deadline_at = Instant::now() + deadline;
    loop {
        let remaining = deadline_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Some(Some(position))) => positions.push(position),
            Ok(Some(None)) => {}
            Ok(None) => break, // all senders dropped, every call finished
            Err(_) => break,   // deadline elapsed
        }

        if positions.len() >= quorum {
            TraceEvent::CouncilQuorumReached {
                request_id: request_id.to_string(),
                responded: positions.len(),
                total,
            }
            .emit();
            break;
        }
    }

    if positions.is_empty() {
        CouncilOutcome::Unavailable
    } else {
        CouncilOutcome::Positions(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_threshold_matches_spec_formula() {
        assert_eq!(quorum_threshold(3), 3);
        assert_eq!(quorum_threshold(4), 3);
        assert_eq!(quorum_threshold(5), 4);
        assert_eq!(quorum_threshold(1), 2);
    }
}
