//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what the model can ask for: retrieve passages from the
//! user's notes, browse a web page, or hand a final response back.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::provider::ToolDescriptor;

/// A request to execute a tool, as extracted from a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool to execute
    pub tool_name: String,

    /// Arguments as a JSON value (normally an object)
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// String argument `key`, if present.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// What a tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(serde_json::Value),
}

impl ToolOutput {
    /// The observation string fed back to the model. Structured output is
    /// JSON-stringified.
    pub fn into_observation(self) -> String {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Json(value) => value.to_string(),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        ToolOutput::Text(s)
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "retriever-tool").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's arguments.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError>;

    /// Describe this tool for prompt embedding.
    fn to_descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Built once per agent and read-only afterwards. Keeps registration order
/// so that prompts built from [`ToolRegistry::describe`] are deterministic.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Fails if a tool with the same name already exists.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        debug!(tool = %name, "Registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tool descriptors, in registration order.
    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.to_descriptor()).collect()
    }

    /// Execute a tool call.
    ///
    /// Only a name missing from the registry is [`ToolError::UnknownTool`];
    /// anything the tool itself returns is a [`ToolError::Execution`]
    /// wrapping its failure.
    pub async fn invoke(&self, call: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(&call.tool_name)
            .ok_or_else(|| ToolError::UnknownTool(call.tool_name.clone()))?;

        match tool.execute(call.arguments.clone()).await {
            Ok(output) => Ok(output),
            Err(e @ ToolError::Execution { .. }) => Err(e),
            Err(other) => Err(ToolError::execution(call.tool_name.clone(), other)),
        }
    }

    /// Execute a tool call, giving up after `timeout`.
    pub async fn invoke_with_timeout(
        &self,
        call: &ToolInvocation,
        timeout: Duration,
    ) -> Result<ToolOutput, ToolError> {
        match tokio::time::timeout(timeout, self.invoke(call)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(tool = %call.tool_name, timeout_secs = timeout.as_secs(), "Tool call timed out");
                Err(ToolError::Timeout {
                    tool_name: call.tool_name.clone(),
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }

    /// All registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
            Ok(ToolOutput::Text(text.to_string()))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Never finishes in time"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ToolOutput::Text("done".into()))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "Always times out internally"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
            Err(ToolError::Timeout {
                tool_name: "inner".into(),
                timeout_secs: 1,
            })
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let err = registry.register(Box::new(EchoTool)).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateTool(ref n) if n == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn describe_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SlowTool)).unwrap();
        registry.register(Box::new(EchoTool)).unwrap();
        registry.register(Box::new(FailingTool)).unwrap();
        let names: Vec<String> = registry.describe().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["slow", "echo", "failing"]);
    }

    #[tokio::test]
    async fn registry_invoke_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        let call = ToolInvocation::new("echo", serde_json::json!({"text": "hello world"}));
        let output = registry.invoke(&call).await.unwrap();
        assert_eq!(output, ToolOutput::Text("hello world".into()));
    }

    #[tokio::test]
    async fn registry_invoke_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolInvocation::new("nonexistent", serde_json::json!({}));
        let err = registry.invoke(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn tool_failures_are_wrapped_as_execution_errors() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool)).unwrap();
        let call = ToolInvocation::new("failing", serde_json::json!({}));
        let err = registry.invoke(&call).await.unwrap_err();
        match err {
            ToolError::Execution { tool_name, source } => {
                assert_eq!(tool_name, "failing");
                assert!(source.to_string().contains("timed out"));
            }
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_arguments_are_wrapped_as_execution_errors() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let call = ToolInvocation::new("echo", serde_json::json!({}));
        let err = registry.invoke(&call).await.unwrap_err();
        match err {
            ToolError::Execution { tool_name, source } => {
                assert_eq!(tool_name, "echo");
                assert!(source.to_string().contains("Missing 'text'"));
            }
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn invoke_with_timeout_expires() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SlowTool)).unwrap();
        let call = ToolInvocation::new("slow", serde_json::json!({}));
        let err = registry
            .invoke_with_timeout(&call, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { timeout_secs: 5, .. }));
    }

    #[test]
    fn json_output_is_stringified() {
        let out = ToolOutput::Json(serde_json::json!({"a": 1}));
        assert_eq!(out.into_observation(), r#"{"a":1}"#);
    }
}
