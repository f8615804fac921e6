//! The agent loop: the heart of VaultMind.
//!
//! The model only produces text, so tool use is a protocol layered on top:
//!
//! 1. **Describe** the tools and the JSON reply schema in the system prompt
//! 2. **Send** the conversation and any earlier tool rounds to the model
//! 3. **Extract** a tool call or a final answer from whatever came back
//! 4. **If a tool call**: run it, add the observation, loop back to step 2
//! 5. **If an answer**: return it to the user
//!
//! The loop ends on a final answer, an iteration limit, or cancellation.

pub mod chat;
pub mod executor;
pub mod extractor;
pub mod prompt;
pub mod scratchpad;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chat::{AgentChain, ChatChain, ChatReply, ChatSession, RagChain, SimpleChain};
pub use executor::{AgentExecutor, AgentOutcome};
pub use extractor::{DEFAULT_FINAL_ANSWER_MARKER, Extraction, ResponseExtractor, parse_tool_calls};
pub use scratchpad::{AgentStep, Scratchpad};
