use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MedBridgeError, Result};

fn default_max_steps() -> u32 {
    10
}

fn default_stream_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub translate: TranslateConfig,
    pub usage: UsageConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP service
    pub host: String,
    /// Bind port for the HTTP service
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chat models callers may select by id
    pub models: Vec<ModelConfig>,
    /// System prompt used when the request carries no override
    pub default_system_prompt: String,
    /// Wall-clock ceiling for one model invocation (seconds)
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
    /// Cap on sequential model/tool steps within one turn
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Identifier callers use to select this model
    pub id: String,
    /// Ollama endpoint URL serving the model
    pub endpoint: String,
    /// Model name as known to the endpoint
    pub model: String,
    /// Credential for authenticated callers; anonymous callers skip it
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Ollama endpoint URL for the translation model
    pub endpoint: String,
    /// Small, fast model used for both translation legs
    pub model: String,
    /// Output budget for the inbound (to-English) leg
    pub max_tokens_to_english: u32,
    /// Output budget for the user-facing (to-Vietnamese) leg
    pub max_tokens_to_vietnamese: u32,
    /// Timeout for one translation call (seconds); shorter than the chat leg
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Daily message allowance for authenticated users
    pub daily_limit: u32,
    /// Daily message allowance for anonymous users
    pub daily_limit_anonymous: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for transcript files, one JSONL file per conversation
    pub transcript_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            chat: ChatConfig {
                models: vec![ModelConfig {
                    id: "med-llm:8b".to_string(),
                    endpoint: "http://localhost:11434".to_string(),
                    model: "rainscales-healthcare-ai/med-llm:8b".to_string(),
                    api_key: None,
                }],
                default_system_prompt: "You are a helpful medical assistant. Answer clearly \
                                        and cite caution where professional care is needed."
                    .to_string(),
                stream_timeout_secs: 60,
                max_steps: 10,
            },
            translate: TranslateConfig {
                endpoint: "http://localhost:11434".to_string(),
                model: "gemma3:4b".to_string(),
                max_tokens_to_english: 1000,
                max_tokens_to_vietnamese: 2000,
                timeout_secs: 30,
            },
            usage: UsageConfig {
                daily_limit: 100,
                daily_limit_anonymous: 10,
            },
            storage: StorageConfig {
                transcript_dir: ".medbridge/transcripts".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MedBridgeError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MedBridgeError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MedBridgeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MedBridgeError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

}

impl ChatConfig {
    /// Look up a chat model configuration by its caller-facing id.
    pub fn find_model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.chat.models.len(), 1);
        assert_eq!(parsed.translate.model, "gemma3:4b");
    }

    #[test]
    fn test_find_model() {
        let config = Config::default();
        assert!(config.chat.find_model("med-llm:8b").is_some());
        assert!(config.chat.find_model("missing").is_none());
    }
}
