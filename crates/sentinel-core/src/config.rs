use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SentinelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    /// The community chat the bot moderates.
    #[serde(default)]
    pub community_chat_id: i64,
    /// Where audit records for schedule add/delete/execute are posted.
    #[serde(default)]
    pub mod_log_chat_id: i64,
    /// Users allowed to use the `.schedule` command.
    #[serde(default)]
    pub moderator_ids: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            community_chat_id: 0,
            mod_log_chat_id: 0,
            moderator_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            api_key: String::new(),
            dimensions: default_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// 0.0 for the deterministic deployment, 0.5 for the moderate one.
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_completion_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_completion_model(),
            api_key: String::new(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default)]
    pub index_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            index_url: String::new(),
            api_key: String::new(),
            namespace: String::new(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaConfig {
    /// Matches below this relevance score never reach the prompt.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Character budget for context blocks packed into one prompt.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Further embedding attempts after the first one fails.
    #[serde(default = "default_embed_retries")]
    pub embed_retries: u32,
    /// Fixed cooldown between embedding attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_docs_url")]
    pub docs_url: String,
}

fn default_min_score() -> f32 {
    0.75
}

fn default_max_context_chars() -> usize {
    16_000
}

fn default_embed_retries() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_docs_url() -> String {
    "https://docs.example.org".to_string()
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            max_context_chars: default_max_context_chars(),
            embed_retries: default_embed_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            docs_url: default_docs_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "sentinel.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-job polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    15
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Config {
    /// Load config: defaults → sentinel.toml → env vars (env wins).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| SentinelError::Config(format!("failed to read config: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| SentinelError::Config(format!("failed to parse config: {e}")))?
        } else {
            Self::default()
        };

        // Override with env vars
        if let Ok(v) = std::env::var("SENTINEL_TELEGRAM_TOKEN") {
            config.telegram.token = v;
        }
        if let Ok(v) = std::env::var("SENTINEL_EMBEDDING_API_KEY") {
            config.embedding.api_key = v;
        }
        if let Ok(v) = std::env::var("SENTINEL_COMPLETION_API_KEY") {
            config.completion.api_key = v;
        }
        if let Ok(v) = std::env::var("SENTINEL_VECTOR_INDEX_URL") {
            config.vector.index_url = v;
        }
        if let Ok(v) = std::env::var("SENTINEL_VECTOR_API_KEY") {
            config.vector.api_key = v;
        }

        // Fallback: completion key reuses the embedding key when only one is set
        if config.completion.api_key.is_empty() {
            config.completion.api_key = config.embedding.api_key.clone();
        }
        if config.embedding.api_key.is_empty() {
            config.embedding.api_key = config.completion.api_key.clone();
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
            vector: VectorConfig::default(),
            qa: QaConfig::default(),
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}
