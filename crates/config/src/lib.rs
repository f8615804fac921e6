//! Configuration loading, validation, and management for VaultMind.
//!
//! Loads configuration from `~/.vaultmind/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vaultmind_core::ToolResultRole;

/// Environment variables that override file settings.
pub const ENV_BASE_URL: &str = "VAULTMIND_BASE_URL";
pub const ENV_MODEL: &str = "VAULTMIND_MODEL";
pub const ENV_API_KEY: &str = "VAULTMIND_API_KEY";
pub const ENV_PROVIDER: &str = "VAULTMIND_PROVIDER";

/// The root configuration structure.
///
/// Maps directly to `~/.vaultmind/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory of Markdown notes to index and chat over
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_dir: Option<PathBuf>,

    /// Chat model backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chunking and retrieval settings
    #[serde(default)]
    pub vectors: VectorsConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend kind: "ollama" or "openai"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as a bearer token. Ollama ignores it.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Wire role for tool results. Unset picks the backend's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result_role: Option<ToolResultRole>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_api_key() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout_secs() -> u64 {
    600
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            api_key: default_api_key(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: None,
            request_timeout_secs: default_request_timeout_secs(),
            tool_result_role: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("tool_result_role", &self.tool_result_role)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorsConfig {
    /// Passages scoring below this are not returned
    #[serde(default = "default_min_similarity_score")]
    pub min_similarity_score: f32,

    /// Maximum passages per query
    #[serde(default = "default_max_k")]
    pub max_k: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_min_similarity_score() -> f32 {
    0.7
}
fn default_max_k() -> usize {
    10
}
fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    20
}

impl Default for VectorsConfig {
    fn default() -> Self {
        Self {
            min_similarity_score: default_min_similarity_score(),
            max_k: default_max_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// What the agent does when one model turn requests several tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallPolicy {
    /// Run the first call, ignore the rest
    #[default]
    FirstOnly,
    /// Run every call, in order, within the turn
    All,
}

/// Which chat chain a session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Tool-calling agent loop
    #[default]
    Agent,
    /// Retrieve once, answer once
    Rag,
    /// Plain chat, no retrieval
    Simple,
}

impl std::str::FromStr for ChatMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "rag" => Ok(Self::Rag),
            "simple" => Ok(Self::Simple),
            other => Err(ConfigError::ValidationError(format!(
                "unknown chat mode '{other}' (expected agent, rag or simple)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model calls allowed per message before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Case-insensitive marker that introduces a final answer
    #[serde(default = "default_final_answer_marker")]
    pub final_answer_marker: String,

    #[serde(default)]
    pub tool_call_policy: ToolCallPolicy,

    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    #[serde(default)]
    pub mode: ChatMode,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_final_answer_marker() -> String {
    "final answer:".into()
}
fn default_model_timeout_secs() -> u64 {
    300
}
fn default_tool_timeout_secs() -> u64 {
    60
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            final_answer_marker: default_final_answer_marker(),
            tool_call_policy: ToolCallPolicy::default(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            mode: ChatMode::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location (`~/.vaultmind/config.toml`),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `VAULTMIND_*` overrides read through `lookup`.
    ///
    /// `load()` passes the process environment; tests pass a map.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.llm.base_url = base_url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.llm.model = model;
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.llm.api_key = api_key;
        }
        if let Some(provider) = lookup(ENV_PROVIDER) {
            self.llm.provider = provider;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".vaultmind")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.llm.provider.as_str(), "ollama" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "llm.provider must be \"ollama\" or \"openai\", got \"{}\"",
                self.llm.provider
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.model must not be empty".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.vectors.min_similarity_score) {
            return Err(ConfigError::ValidationError(
                "vectors.min_similarity_score must be between 0.0 and 1.0".into(),
            ));
        }

        if self.vectors.chunk_size == 0 || self.vectors.chunk_overlap >= self.vectors.chunk_size {
            return Err(ConfigError::ValidationError(
                "vectors.chunk_overlap must be smaller than a non-zero vectors.chunk_size".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.final_answer_marker.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.final_answer_marker must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Write this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |e: std::io::Error| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(write_err)
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for vaultmind_core::Error {
    fn from(e: ConfigError) -> Self {
        vaultmind_core::Error::Config {
            message: e.to_string(),
        }
    }
}
