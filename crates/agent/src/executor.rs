//! The agent loop — drives a text-only model through tool use.
//!
//! Each turn:
//!
//! 1. **Build** the messages: system prompt (tools, reply schema, marker),
//!    chat history, the user's input, then the scratchpad of earlier tool
//!    rounds
//! 2. **Call** the model
//! 3. **Extract** tool calls or a final answer from its reply
//! 4. **If tool calls**: run them, record the observations, loop back to 1
//! 5. **Otherwise**: strip the marker and return the answer
//!
//! A reply with neither a tool call nor the marker counts as the answer.
//! The loop gives up with [`AgentError::IterationLimitExceeded`] rather than
//! making more than `max_iterations` model calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vaultmind_config::{AppConfig, ToolCallPolicy};
use vaultmind_core::error::AgentError;
use vaultmind_core::event::{DomainEvent, EventBus};
use vaultmind_core::message::Message;
use vaultmind_core::provider::{ChatRequest, ModelAdapter};
use vaultmind_core::tool::{ToolInvocation, ToolRegistry};
use vaultmind_tools::QUERY_RESPONSE_TOOL;

use crate::extractor::{Extraction, ResponseExtractor};
use crate::prompt;
use crate::scratchpad::{AgentStep, Scratchpad};

/// The result of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    /// The final answer, marker stripped.
    pub answer: String,
    /// Every tool round, in order.
    pub steps: Vec<AgentStep>,
    /// Model calls made.
    pub iterations: u32,
}

pub struct AgentExecutor {
    adapter: Arc<dyn ModelAdapter>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    extractor: ResponseExtractor,
    policy: ToolCallPolicy,
    max_iterations: u32,
    model_timeout: Duration,
    tool_timeout: Duration,
    event_bus: Option<Arc<EventBus>>,
}

impl AgentExecutor {
    pub fn new(adapter: Arc<dyn ModelAdapter>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            adapter,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            extractor: ResponseExtractor::default(),
            policy: ToolCallPolicy::default(),
            max_iterations: 10,
            model_timeout: Duration::from_secs(300),
            tool_timeout: Duration::from_secs(60),
            event_bus: None,
        }
    }

    /// Build an executor with the model and agent settings from `config`.
    pub fn from_config(
        adapter: Arc<dyn ModelAdapter>,
        tools: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        let mut executor = Self::new(adapter, config.llm.model.clone(), tools)
            .with_temperature(config.llm.temperature)
            .with_max_iterations(config.agent.max_iterations)
            .with_final_answer_marker(config.agent.final_answer_marker.clone())
            .with_tool_call_policy(config.agent.tool_call_policy)
            .with_model_timeout(Duration::from_secs(config.agent.model_timeout_secs))
            .with_tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs));
        if let Some(max) = config.llm.max_tokens {
            executor = executor.with_max_tokens(max);
        }
        executor
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of model calls per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_final_answer_marker(mut self, marker: impl Into<String>) -> Self {
        self.extractor = ResponseExtractor::new(marker);
        self
    }

    pub fn with_tool_call_policy(mut self, policy: ToolCallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `input` given the earlier `history`.
    ///
    /// Cancellation is checked before every model call and every tool call.
    pub async fn run(
        &self,
        history: &[Message],
        input: &Message,
        cancel: &CancellationToken,
    ) -> Result<AgentOutcome, AgentError> {
        let result = self.run_turns(history, input, cancel).await;
        if let Err(e) = &result {
            self.publish(DomainEvent::ErrorOccurred {
                context: "agent".into(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        result
    }

    async fn run_turns(
        &self,
        history: &[Message],
        input: &Message,
        cancel: &CancellationToken,
    ) -> Result<AgentOutcome, AgentError> {
        let descriptors = self.tools.describe();
        let system = Message::system(prompt::system_prompt(
            &descriptors,
            self.extractor.marker(),
            self.policy,
        ));
        let mut scratchpad = Scratchpad::new();
        let mut iterations = 0u32;

        info!(history = history.len(), tools = descriptors.len(), "Starting agent run");

        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            if iterations >= self.max_iterations {
                warn!(limit = self.max_iterations, "Iteration limit reached without a final answer");
                return Err(AgentError::IterationLimitExceeded {
                    limit: self.max_iterations,
                });
            }
            iterations += 1;

            let mut messages = Vec::with_capacity(history.len() + 2 + scratchpad.len() * 2);
            messages.push(system.clone());
            messages.extend(history.iter().cloned());
            messages.push(input.clone());
            messages.extend(scratchpad.render());

            let request = ChatRequest {
                model: self.model.clone(),
                messages,
                tools: descriptors.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            debug!(iteration = iterations, model = %self.model, "Calling model");
            let response = tokio::time::timeout(self.model_timeout, self.adapter.complete(request))
                .await
                .map_err(|_| AgentError::ModelTimeout {
                    timeout_secs: self.model_timeout.as_secs(),
                })??;

            self.publish(DomainEvent::ModelResponded {
                model: response.model.clone(),
                tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
                timestamp: Utc::now(),
            });

            let calls = match self.extractor.extract(&response.text) {
                Extraction::FinalAnswer(answer) => {
                    return Ok(self.finish(&answer, scratchpad, iterations));
                }
                Extraction::Unparsed(raw) => {
                    debug!(iteration = iterations, "Reply has no tool call or marker, using it as the answer");
                    return Ok(self.finish(&raw, scratchpad, iterations));
                }
                Extraction::ToolCall(calls) => self.apply_policy(calls),
            };

            for call in calls {
                if call.tool_name == QUERY_RESPONSE_TOOL
                    && let Some(response) = call.str_arg("response")
                {
                    debug!(iteration = iterations, "Model answered through the response tool");
                    return Ok(self.finish(response, scratchpad, iterations));
                }

                if cancel.is_cancelled() {
                    return Err(AgentError::Cancelled);
                }

                let observation = self.execute(&call, iterations).await?;
                scratchpad.push(AgentStep {
                    request: call,
                    observation,
                });
            }
        }
    }

    fn apply_policy(&self, mut calls: Vec<ToolInvocation>) -> Vec<ToolInvocation> {
        match self.policy {
            ToolCallPolicy::All => calls,
            ToolCallPolicy::FirstOnly => {
                if calls.len() > 1 {
                    debug!(ignored = calls.len() - 1, "Only the first tool call of a turn is run");
                    calls.truncate(1);
                }
                calls
            }
        }
    }

    /// Run one tool call. Tool failures become `Error: ...` observations; an
    /// unknown tool ends the run.
    async fn execute(&self, call: &ToolInvocation, iteration: u32) -> Result<String, AgentError> {
        if !self.tools.contains(&call.tool_name) {
            warn!(tool = %call.tool_name, "Model requested a tool that is not registered");
            return Err(AgentError::UnknownTool(call.tool_name.clone()));
        }

        let start = Instant::now();
        let result = self.tools.invoke_with_timeout(call, self.tool_timeout).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (observation, success) = match result {
            Ok(output) => (output.into_observation(), true),
            Err(e) => {
                warn!(tool = %call.tool_name, error = %e, "Tool execution failed");
                (format!("Error: {e}"), false)
            }
        };

        info!(iteration, tool = %call.tool_name, duration_ms, success, "Tool executed");
        self.publish(DomainEvent::ToolExecuted {
            tool_name: call.tool_name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(observation)
    }

    fn finish(&self, answer: &str, scratchpad: Scratchpad, iterations: u32) -> AgentOutcome {
        let answer = self.extractor.strip_marker(answer);
        info!(iterations, steps = scratchpad.len(), "Agent produced a final answer");
        AgentOutcome {
            answer,
            steps: scratchpad.into_steps(),
            iterations,
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}
