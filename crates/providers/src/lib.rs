//! Chat model adapters for VaultMind.
//!
//! All adapters implement the `vaultmind_core::ModelAdapter` trait.
//! [`build_adapter`] selects one based on configuration.

pub mod convert;
pub mod factory;
pub mod ollama;
pub mod openai_compat;

pub use convert::{FlatContent, flatten_content, map_role};
pub use factory::build_adapter;
pub use ollama::OllamaAdapter;
pub use openai_compat::OpenAiCompatAdapter;
