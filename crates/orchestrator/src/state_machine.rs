//! The orchestrator state machine (spec §4.6): `ProcessRequest` and
//! `ProcessRequestStream`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use orch_domain::config::{OrchestratorConfig, RouterConfig};
use orch_domain::error::{Error, Result};
use orch_domain::trace::TraceEvent;
use orch_kip::KipExecutor;
use orch_kv::KvStore;
use orch_providers::{ModelRouter, RoutingIntent};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::action::parse_action;
use crate::cancel::CancelToken;
use crate::council::{self, CouncilOutcome};
use crate::events::StreamEvent;
use crate::intent::classify_request;
use crate::phase::{Phase, PathTaken};
use crate::pheromind;
use crate::synthesis;

/// Result of a completed, successful request (spec §6 `POST /api/chat`).
#[derive(Debug, Clone, Serialize)]
pub struct FinalState {
    pub response: String,
    pub intent: Option<String>,
    pub processing_time_ms: u64,
    pub path_taken: PathTaken,
}

pub struct Orchestrator {
    router: Arc<ModelRouter>,
    kv: Arc<dyn KvStore>,
    kip: Option<Arc<KipExecutor>>,
    router_config: RouterConfig,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        router: Arc<ModelRouter>,
        kv: Arc<dyn KvStore>,
        kip: Option<Arc<KipExecutor>>,
        router_config: RouterConfig,
        config: OrchestratorConfig,
    ) -> Self {
        Self { router, kv, kip, router_config, config }
    }

    /// Non-streaming entry point. Internally drains the same event stream
    /// the streaming surface uses, keeping exactly one code path.
    pub async fn process_request(
        &self,
        request_id: &str,
        user_input: &str,
        conversation_id: &str,
        cancel: CancelToken,
    ) -> Result<FinalState> {
        let mut rx = self.process_request_stream(request_id, user_input, conversation_id, cancel);
        let mut final_state = None;
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Final { content, metadata } => {
                    final_state = Some(FinalState {
                        response: content,
                        intent: metadata.get("intent").and_then(|v| v.as_str()).map(str::to_string),
                        processing_time_ms: metadata
                            .get("processing_time_ms")
                            .and_then(|v| v.as_u64())
                            .unwrap_or(0),
                        path_taken: serde_json::from_value(
                            metadata.get("path_taken").cloned().unwrap_or(json!("unknown")),
                        )
                        .unwrap_or(PathTaken::Unknown),
                    });
                }
                StreamEvent::Error { message, .. } => return Err(Error::Other(message)),
                StreamEvent::Cancelled => return Err(Error::Cancelled),
                _ => {}
            }
        }
        final_state.ok_or_else(|| Error::Other("orchestrator stream closed without a final event".to_string()))
    }

    /// Streaming entry point (spec §4.6 `ProcessRequestStream`). Spawns the
    /// run and returns a channel of ordered [`StreamEvent`]s; the overall
    /// request cap (spec §4.6 "Timeouts") wraps the whole run.
    pub fn process_request_stream(
        &self,
        request_id: &str,
        user_input: &str,
        conversation_id: &str,
        cancel: CancelToken,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(64);
        let router = Arc::clone(&self.router);
        let kv = Arc::clone(&self.kv);
        let kip = self.kip.clone();
        let router_config = self.router_config.clone();
        let overall_timeout = Duration::from_millis(self.config.request_timeout_ms);
        let pheromind_ttl = self.config.pheromind_ttl_secs;
        let pheromind_max = self.config.pheromind_max_signals;
        let request_id = request_id.to_string();
        let user_input = user_input.to_string();
        let conversation_id = conversation_id.to_string();

        tokio::spawn(async move {
            let started = Instant::now();
            let run = run_inner(
                &request_id,
                &user_input,
                &conversation_id,
                &router,
                &kv,
                kip.as_ref(),
                &router_config,
                pheromind_ttl,
                pheromind_max,
                &cancel,
                &tx,
                started,
            );

            match tokio::time::timeout(overall_timeout, run).await {
                Ok(Ok(())) => {}
                Ok(Err(Error::Cancelled)) => {
                    let _ = tx.send(StreamEvent::Cancelled).await;
                }
                Ok(Err(e)) => {
                    let _ = tx
                        .send(StreamEvent::Error { phase: Phase::Failed, message: e.client_message().to_string() })
                        .await;
                }
                Err(_) => {
                    let _ = tx
                        .send(StreamEvent::Error { phase: Phase::Failed, message: "request_timeout".to_string() })
                        .await;
                }
            }
        });

        rx
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_inner(
    request_id: &str,
    user_input: &str,
    conversation_id: &str,
    router: &Arc<ModelRouter>,
    kv: &Arc<dyn KvStore>,
    kip: Option<&Arc<KipExecutor>>,
    router_config: &RouterConfig,
    pheromind_ttl: u64,
    pheromind_max: usize,
    cancel: &CancelToken,
    tx: &mpsc::Sender<StreamEvent>,
    started: Instant,
) -> Result<()> {
    check_cancelled(cancel)?;
    send(tx, StreamEvent::Status { phase: Phase::Received, message: "request received".to_string() }).await;
    transition(request_id, Phase::Received, Phase::SmartRouter);

    send(tx, StreamEvent::Status { phase: Phase::SmartRouter, message: "classifying intent".to_string() }).await;
    let (intent, confidence) =
        classify_request(request_id, router, router_config.classifier_alias.as_deref(), user_input).await;
    send(
        tx,
        StreamEvent::PhaseComplete {
            phase: Phase::SmartRouter,
            metadata: json!({"intent": intent, "confidence": confidence}),
        },
    )
    .await;
    check_cancelled(cancel)?;

    let mut pheromind_signals = Vec::new();
    let mut council_positions = Vec::new();
    let mut path_taken = PathTaken::Unknown;

    if intent == RoutingIntent::Exploratory {
        transition(request_id, Phase::SmartRouter, Phase::PheromindScan);
        send(tx, StreamEvent::Status { phase: Phase::PheromindScan, message: "scanning ambient signals".to_string() })
            .await;
        pheromind_signals = pheromind::scan(kv, conversation_id, pheromind_max).await;
        send(
            tx,
            StreamEvent::PhaseComplete {
                phase: Phase::PheromindScan,
                metadata: json!({"signal_count": pheromind_signals.len()}),
            },
        )
        .await;
        path_taken = PathTaken::PheromindScan;
        check_cancelled(cancel)?;
    }

    if intent != RoutingIntent::SimpleQuery {
        transition(request_id, Phase::SmartRouter, Phase::CouncilDeliberation);
        send(
            tx,
            StreamEvent::Status { phase: Phase::CouncilDeliberation, message: "convening council".to_string() },
        )
        .await;
        let deadline = Duration::from_millis(router_config.council_deadline_ms);
        match council::deliberate(request_id, router, &router_config.council_aliases, user_input, deadline).await {
            CouncilOutcome::Positions(positions) => {
                council_positions = positions;
                send(
                    tx,
                    StreamEvent::PhaseComplete {
                        phase: Phase::CouncilDeliberation,
                        metadata: json!({"responded": council_positions.len()}),
                    },
                )
                .await;
            }
            CouncilOutcome::Unavailable => {
                return Err(Error::Other("council_unavailable".to_string()));
            }
        }
        if path_taken == PathTaken::Unknown {
            path_taken = if intent == RoutingIntent::Action { PathTaken::KipExecution } else { PathTaken::CouncilDeliberation };
        }
        check_cancelled(cancel)?;
    } else {
        path_taken = PathTaken::FastResponse;
    }

    transition(
        request_id,
        if intent == RoutingIntent::SimpleQuery { Phase::SmartRouter } else { Phase::CouncilDeliberation },
        Phase::Synthesis,
    );
    send(tx, StreamEvent::Status { phase: Phase::Synthesis, message: "synthesizing response".to_string() }).await;
    let prompt = synthesis::build_prompt(user_input, intent, &pheromind_signals, &council_positions);
    let deadline = Duration::from_millis(router_config.synthesis_deadline_ms);
    let synthesis_result = tokio::time::timeout(
        deadline,
        synthesis::synthesize(request_id, router, &router_config.synthesis_alias, &prompt),
    )
    .await
    .map_err(|_| Error::RequestTimeout)??;
    send(
        tx,
        StreamEvent::PhaseComplete { phase: Phase::Synthesis, metadata: json!({"model": synthesis_result.model}) },
    )
    .await;
    check_cancelled(cancel)?;

    pheromind::record(kv, conversation_id, &synthesis_result.content, pheromind_ttl).await;

    let mut final_response = synthesis_result.content;

    if intent == RoutingIntent::Action {
        transition(request_id, Phase::Synthesis, Phase::KipExecution);
        if let (Some(kip), Some(action)) = (kip, parse_action(&final_response)) {
            send(
                tx,
                StreamEvent::Status { phase: Phase::KipExecution, message: format!("invoking tool {}", action.tool_name) },
            )
            .await;
            let default_agent = "orchestrator";
            let result = kip.execute_action(default_agent, &action.tool_name, action.params).await;
            send(
                tx,
                StreamEvent::PhaseComplete {
                    phase: Phase::KipExecution,
                    metadata: serde_json::to_value(&result).unwrap_or(json!({})),
                },
            )
            .await;
            if let Some(data) = result.data {
                final_response = format!("{final_response}\n\n{data}");
            } else if let Some(message) = result.message {
                final_response = format!("{final_response}\n\n{message}");
            }
        }
    }

    transition(request_id, Phase::Synthesis, Phase::Complete);
    send(
        tx,
        StreamEvent::Final {
            content: final_response,
            metadata: json!({
                "intent": intent,
                "processing_time_ms": started.elapsed().as_millis() as u64,
                "path_taken": path_taken,
            }),
        },
    )
    .await;

    Ok(())
}

fn check_cancelled(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

fn transition(request_id: &str, from: Phase, to: Phase) {
    TraceEvent::PhaseTransition { request_id: request_id.to_string(), from: format!("{from:?}"), to: format!("{to:?}") }
        .emit();
}

async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) {
    let _ = tx.send(event).await;
}
