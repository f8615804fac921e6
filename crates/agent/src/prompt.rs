//! System prompt for the tool-calling agent.

use vaultmind_config::ToolCallPolicy;
use vaultmind_core::provider::ToolDescriptor;

/// The reply shape the model must use to call a tool. The extractor's
/// parsing depends on the model mimicking it.
pub const TOOLS_SCHEMA: &str = r#"{
  "tool_calls": [{
    "name": "<name of the selected tool>",
    "arguments": <parameters for the selected tool, matching the tool's JSON schema>
  }]
}"#;

/// One JSON object per line, in registration order.
pub fn describe_tools(descriptors: &[ToolDescriptor]) -> String {
    descriptors
        .iter()
        .filter_map(|d| serde_json::to_string(d).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn system_prompt(descriptors: &[ToolDescriptor], marker: &str, policy: ToolCallPolicy) -> String {
    let tools = describe_tools(descriptors);
    let one_at_a_time = match policy {
        ToolCallPolicy::FirstOnly => "You can only use one tool at a time.",
        ToolCallPolicy::All => {
            "You may list several tools in one reply; they are used in the order given."
        }
    };

    format!(
        "You are an helpful AI assistant designed to help users with their queries.

You have access to the following tools:
{tools}

YOU MUST FOLLOW THESE INSTRUCTIONS CAREFULLY.

<instructions>
1. To respond to the users message, you can use one of the tools provided above.
2. {one_at_a_time}
3. If you decide to use a tool, you must respond in the JSON format matching the following schema:
{TOOLS_SCHEMA}
4. To use a tool, just respond with the JSON matching the schema. Nothing else. Do not add any additional notes or explanations.
5. After you use a tool, the next message you get will contain the result of the tool call.
6. REMEMBER: To use a tool, you must respond only in JSON format.
7. After you use a tool and receive the result back, respond regularly to answer the users question.
8. Only use the tools you are provided.
9. Use markdown to format your answers.
10. When using a tool, ensure your message contains ONLY the JSON blob. DO NOT RESPOND WITH ANY OTHER COMMENTS, INFORMATION, NOTES, ETC.
11. Your final response to the user should be a COMPLETE RESPONSE to their query. Even if you have given them some information already, your last message should be a COMPLETE RESPONSE.
12. When you answer in plain text rather than with a tool, begin your final response with \"{marker}\" followed by the answer. Never put \"{marker}\" inside a tool's arguments.
</instructions>"
    )
}
