//! Configuration management for Planwise
//!
//! Supports environment variables, config files, and runtime overrides.
//! Every knob of the completion client lives here instead of in process-wide
//! state, and is handed to the client constructor explicitly.
//!
//! Config file location: ~/.config/planwise/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{PlanwiseError, Result};

/// Main configuration for Planwise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion client configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Orchestrator behavior
    #[serde(default)]
    pub agent: AgentConfig,
    /// Where tools read and write files
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Which completion backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Any OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
    /// A local Ollama server
    Ollama,
}

impl std::str::FromStr for ProviderType {
    type Err = PlanwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(PlanwiseError::config(format!("Unknown provider '{}'", other))),
        }
    }
}

/// Completion client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend type
    pub provider: ProviderType,
    /// Model identifier passed to the provider
    pub model: String,
    /// Base URL of the provider API
    pub base_url: String,
    /// API key; read from the environment, never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens per completion
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient transport failures
    pub max_retries: u32,
    /// Base delay of the exponential retry backoff
    pub retry_base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let provider = env::var("PLANWISE_PROVIDER")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(ProviderType::OpenAi);

        let base_url = match provider {
            ProviderType::OpenAi => env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            ProviderType::Ollama => env::var("OLLAMA_HOST")
                .map(|host| {
                    if host.starts_with("http") {
                        host
                    } else {
                        format!("http://{}", host)
                    }
                })
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        };

        Self {
            provider,
            model: env::var("MODEL_NAME").unwrap_or_else(|_| "gpt-4o".to_string()),
            base_url,
            api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            temperature: env::var("TEMPERATURE")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.1),
            max_tokens: env::var("MAX_TOKENS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(16384),
            timeout_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

/// Orchestrator behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Re-plan after every completed step instead of executing straight through
    /// Default: false
    pub replan_after_each_step: bool,
    /// Parse failures tolerated while re-planning before giving up
    /// Default: 3
    pub max_replan_attempts: usize,
    /// Optional cap on model turns inside one tool loop (unset = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tool_rounds: Option<usize>,
    /// Whether to log full prompts and responses
    pub debug: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            replan_after_each_step: env::var("PLANWISE_REPLAN")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            max_replan_attempts: 3,
            max_tool_rounds: None,
            debug: env::var("PLANWISE_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Filesystem layout used by the tools
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory tools resolve relative paths against
    pub root: PathBuf,
    /// Output directory (relative to `root`) holding per-task folders
    pub output_dir: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: env::var("PLANWISE_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            output_dir: "output".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("planwise")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file(&Self::config_file()) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlanwiseError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| PlanwiseError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text. The API key still comes from the
    /// environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| PlanwiseError::config(format!("Failed to parse config: {}", e)))?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| PlanwiseError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PlanwiseError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| PlanwiseError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.llm.base_url).map_err(|e| {
            PlanwiseError::config(format!("Invalid base_url '{}': {}", self.llm.base_url, e))
        })?;

        if self.llm.model.trim().is_empty() {
            return Err(PlanwiseError::config("Model name must not be empty"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(PlanwiseError::config(format!(
                "Temperature {} is outside 0.0..=2.0",
                self.llm.temperature
            )));
        }

        if self.agent.max_replan_attempts == 0 {
            return Err(PlanwiseError::config(
                "max_replan_attempts must be at least 1",
            ));
        }

        if self.agent.max_tool_rounds == Some(0) {
            return Err(PlanwiseError::config(
                "max_tool_rounds must be at least 1 when set",
            ));
        }

        Ok(())
    }

    /// Update the model
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.llm.model = model.into();
    }
}
