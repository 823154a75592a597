// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// LLM provider used for summarization and compaction.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Defaults for the context memory settings.
    #[serde(default)]
    pub context_memory: ContextMemoryConfig,

    /// Conversation summarizer settings.
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Knowledge compaction thresholds.
    #[serde(default)]
    pub compaction: CompactionConfig,

    /// Runtime settings store.
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Assistant identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base system prompt that the context block is prepended to.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
        }
    }
}

fn default_agent_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for concurrent reads.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    data_file("parley.db")
}

fn default_wal_mode() -> bool {
    true
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .to_string_lossy()
        .into_owned()
}

/// OpenAI-compatible provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// When false, summarization and compaction are skipped.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the chat completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. Falls back to `PARLEY_API_KEY`, then `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for summarization and compaction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from config, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("PARLEY_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Defaults for the runtime context memory settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextMemoryConfig {
    /// Whether context is injected into prompts.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Token budget for the injected context block.
    #[serde(default = "default_context_max_tokens")]
    pub max_tokens: u32,

    /// How many days of recent summaries to include.
    #[serde(default = "default_context_days")]
    pub days: u32,

    /// How long an assembled context block is reused.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ContextMemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: default_context_max_tokens(),
            days: default_context_days(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_context_max_tokens() -> u32 {
    1500
}

fn default_context_days() -> u32 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Conversation summarizer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizerConfig {
    /// Complete user/assistant exchanges required before summarizing.
    #[serde(default = "default_min_exchanges")]
    pub min_exchanges: u32,

    /// Response token limit for the summarization call.
    #[serde(default = "default_summarizer_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            min_exchanges: default_min_exchanges(),
            max_tokens: default_summarizer_max_tokens(),
        }
    }
}

fn default_min_exchanges() -> u32 {
    2
}

fn default_summarizer_max_tokens() -> u32 {
    1500
}

/// Knowledge compaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompactionConfig {
    /// Uncompacted summary count that forces a run regardless of recency.
    #[serde(default = "default_max_uncompacted")]
    pub max_uncompacted: u32,

    /// Days between scheduled runs.
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,

    /// Maximum number of summaries fed into one run.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Response token limit for the compaction call.
    #[serde(default = "default_compaction_max_tokens")]
    pub max_tokens: u32,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            max_uncompacted: default_max_uncompacted(),
            interval_days: default_interval_days(),
            batch_size: default_batch_size(),
            max_tokens: default_compaction_max_tokens(),
        }
    }
}

fn default_max_uncompacted() -> u32 {
    50
}

fn default_interval_days() -> u32 {
    30
}

fn default_batch_size() -> u32 {
    100
}

fn default_compaction_max_tokens() -> u32 {
    2000
}

/// Runtime settings store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    /// JSON file holding user-changed settings.
    #[serde(default = "default_settings_path")]
    pub path: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

fn default_settings_path() -> String {
    data_file("settings.json")
}
