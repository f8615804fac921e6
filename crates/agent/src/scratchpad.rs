//! Scratchpad — the tool rounds of one agent run, replayed to the model on
//! every turn.

use serde::Serialize;
use serde_json::json;
use vaultmind_core::message::Message;
use vaultmind_core::tool::ToolInvocation;

/// One completed tool round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub request: ToolInvocation,
    pub observation: String,
}

impl AgentStep {
    /// Id linking the request message to its result; `{tool}_{index}`.
    pub fn call_id(&self, index: usize) -> String {
        format!("{}_{index}", self.request.tool_name)
    }

    /// The request as the model would have written it.
    pub fn request_json(&self) -> String {
        json!({
            "tool_calls": [{
                "name": self.request.tool_name,
                "arguments": self.request.arguments,
            }]
        })
        .to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scratchpad {
    steps: Vec<AgentStep>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: AgentStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<AgentStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Each step as an assistant message carrying the request JSON, followed
    /// by the tool-result message carrying the observation verbatim.
    pub fn render(&self) -> Vec<Message> {
        self.steps
            .iter()
            .enumerate()
            .flat_map(|(index, step)| {
                let id = step.call_id(index);
                [
                    Message::tool_request(id.clone(), step.request_json()),
                    Message::tool_result(id, step.observation.clone()),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{Extraction, ResponseExtractor};
    use vaultmind_core::message::{Conversation, Role};

    fn step(name: &str, query: &str, observation: &str) -> AgentStep {
        AgentStep {
            request: ToolInvocation::new(name, serde_json::json!({ "query": query })),
            observation: observation.into(),
        }
    }

    #[test]
    fn render_pairs_request_and_result() {
        let mut pad = Scratchpad::new();
        pad.push(step("retriever-tool", "vacation plans", "Paris trip notes..."));
        pad.push(step("retriever-tool", "budget", "{\"total\":4000}"));

        let messages = pad.render();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[1].role, Role::ToolResult);
        assert_eq!(messages[1].tool_call_id.as_deref(), Some("retriever-tool_0"));
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("retriever-tool_1"));

        // Rendered messages satisfy the conversation's ordering rule.
        let mut conversation = Conversation::new();
        for message in messages {
            conversation.push(message).unwrap();
        }
        assert_eq!(conversation.len(), 4);
    }

    #[test]
    fn render_round_trips_request_and_observation() {
        let original = step("retriever-tool", "vacation plans", "Paris trip notes...\n- Louvre");
        let mut pad = Scratchpad::new();
        pad.push(original.clone());

        let messages = pad.render();
        let Extraction::ToolCall(calls) = ResponseExtractor::default().extract(&messages[0].text())
        else {
            panic!("request did not re-extract as a tool call");
        };
        assert_eq!(calls, vec![original.request]);
        assert_eq!(messages[1].text(), original.observation);
    }
}
