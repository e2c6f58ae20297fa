//! Agent loop runner.
//!
//! One run is a sequential state machine over a transcript:
//!
//! ```text
//! Deciding --(tool requests)--> Acting --> Deciding
//! Deciding --(no requests)----> Terminal
//! ```
//!
//! The number of Acting phases per run is bounded; a decision that still asks
//! for tools once the bound is spent ends the run with
//! [`FinanceError::NonConvergence`].

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AgentConfig, DEFAULT_MAX_ITERATIONS};
use crate::error::{FinanceError, Result};
use crate::market::MarketDataProvider;
use crate::provider;
use crate::tools::{finance_registry, ToolExecutor, ToolRegistry};
use crate::types::{Message, Usage};

use super::decision::{DecisionStep, ModelDecisionStep};
use super::events::{LoopEventEmitter, LoopEventPayload, LoopEventSink};
use super::types::{LoopOutput, LoopState};

/// Alternates decisions and tool execution until the model answers.
#[derive(Clone)]
pub struct AgentLoop {
    decision: Arc<dyn DecisionStep>,
    executor: ToolExecutor,
    max_iterations: usize,
    event_sink: Option<LoopEventSink>,
}

impl AgentLoop {
    pub fn new(decision: Arc<dyn DecisionStep>, executor: ToolExecutor) -> Self {
        Self {
            decision,
            executor,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            event_sink: None,
        }
    }

    /// Wire a model-backed loop over the finance tool catalogue.
    pub fn from_config(config: &AgentConfig, market: Arc<dyn MarketDataProvider>) -> Result<Self> {
        config.validate()?;
        let model = config.language_model()?;
        let provider: Arc<dyn provider::ModelProvider> =
            Arc::from(provider::create_provider(&model, config)?);
        let registry = Arc::new(finance_registry(market)?);

        let decision = ModelDecisionStep::new(provider, registry.definitions())
            .with_settings(config.generation_settings())
            .with_timeout(config.decision_timeout());
        let executor = ToolExecutor::new(registry)
            .with_timeout(config.tool_timeout())
            .with_parallel(config.parallel_tools);

        Ok(Self::new(Arc::new(decision), executor).with_max_iterations(config.max_iterations))
    }

    /// Ceiling on Acting phases per run.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_event_sink(mut self, sink: LoopEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    /// Run the loop over `transcript` and return it extended with every
    /// assistant message and tool result produced.
    ///
    /// On error the caller's transcript is not modified; it was moved in and
    /// the partial run is dropped.
    pub async fn run(&self, transcript: Vec<Message>) -> Result<LoopOutput> {
        let run_id = Uuid::new_v4();
        let emitter = LoopEventEmitter::new(run_id, self.event_sink.clone());
        let result = self.drive(run_id, transcript, &emitter).await;
        if let Err(err) = &result {
            warn!(run_id = %run_id, error = %err, "agent run failed");
            emitter.emit(LoopEventPayload::Failed {
                error: err.to_string(),
            });
        }
        result
    }

    async fn drive(
        &self,
        run_id: Uuid,
        mut transcript: Vec<Message>,
        emitter: &LoopEventEmitter,
    ) -> Result<LoopOutput> {
        debug!(run_id = %run_id, messages = transcript.len(), "agent run start");

        let mut state = LoopState::Deciding;
        let mut decision_phases = 0usize;
        let mut acting_phases = 0usize;
        let mut usage = Usage::default();

        loop {
            state = match state {
                LoopState::Deciding => {
                    decision_phases += 1;
                    emitter.emit(LoopEventPayload::DecisionStarted {
                        iteration: decision_phases,
                    });
                    let decision = self.decision.decide(&transcript).await?;
                    usage.merge(&decision.usage);

                    let requests = decision.message.tool_calls().len();
                    debug!(
                        run_id = %run_id,
                        iteration = decision_phases,
                        requests,
                        "decision received"
                    );
                    if requests > 0 && acting_phases >= self.max_iterations {
                        return Err(FinanceError::NonConvergence {
                            max_iterations: self.max_iterations,
                        });
                    }
                    transcript.push(decision.message);
                    if requests > 0 {
                        LoopState::Acting
                    } else {
                        LoopState::Terminal
                    }
                }
                LoopState::Acting => {
                    acting_phases += 1;
                    let requests = transcript
                        .last()
                        .map(|m| m.tool_calls().to_vec())
                        .unwrap_or_default();
                    let results = self
                        .executor
                        .execute_all_observed(
                            &requests,
                            |request| {
                                emitter.emit(LoopEventPayload::ToolCallStarted {
                                    tool_call_id: request.id.clone(),
                                    tool_name: request.name.clone(),
                                    arguments: request.arguments.clone(),
                                })
                            },
                            |request, result| {
                                emitter.emit(LoopEventPayload::ToolCallCompleted {
                                    tool_call_id: request.id.clone(),
                                    tool_name: request.name.clone(),
                                    is_error: result.is_error,
                                })
                            },
                        )
                        .await;
                    transcript.extend(results);
                    LoopState::Deciding
                }
                LoopState::Terminal => break,
            };
        }

        info!(
            run_id = %run_id,
            decision_phases,
            acting_phases,
            total_tokens = usage.total_tokens,
            "agent run completed"
        );
        emitter.emit(LoopEventPayload::Completed {
            decision_phases,
            acting_phases,
        });

        Ok(LoopOutput {
            run_id,
            transcript,
            decision_phases,
            acting_phases,
            usage,
        })
    }
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("executor", &self.executor)
            .field("max_iterations", &self.max_iterations)
            .field("event_sink", &self.event_sink.is_some())
            .finish()
    }
}
