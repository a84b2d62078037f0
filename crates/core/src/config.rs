//! Configuration management for the SafeChat pipeline.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables (`SAFECHAT_*`)
//! - Command-line flags
//! - Config files (.safechat/config.yaml)
//!
//! The configuration is workspace-centric, with most state stored in `.safechat/`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// pipeline behavior across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .safechat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider (e.g., "ollama")
    pub provider: String,

    /// Completion model identifier
    pub model: String,

    /// Optional custom completion endpoint
    pub llm_endpoint: Option<String>,

    /// Guardrail gateway settings
    pub gateway: GatewayConfig,

    /// Embedding settings
    pub embedding: EmbeddingConfig,

    /// Retrieval and chunking settings
    pub retrieval: RetrievalConfig,

    /// Per-request deadline in seconds for network-bound pipeline steps
    pub request_timeout_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Guardrail gateway configuration.
///
/// The bearer token is never stored in the config file; `token_env` names the
/// environment variable that holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Prompts endpoint of the moderation gateway
    pub endpoint: String,

    /// Gateway project identifier
    pub project: String,

    /// Environment variable holding the bearer token
    #[serde(rename = "tokenEnv")]
    pub token_env: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            project: String::new(),
            token_env: "SAFECHAT_GATEWAY_TOKEN".to_string(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider identifier ("trigram", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Embedding vector dimension
    pub dimensions: usize,

    /// Optional custom endpoint (remote providers only)
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            // Local-first default: deterministic, no network
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Retrieval and chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per query
    #[serde(rename = "topK")]
    pub top_k: u32,

    /// Minimum cosine similarity for a chunk to be considered relevant
    #[serde(rename = "minScore")]
    pub min_score: f32,

    /// Chunk size in characters
    #[serde(rename = "chunkSize")]
    pub chunk_size: u32,

    /// Overlap between adjacent chunks in characters
    #[serde(rename = "chunkOverlap")]
    pub chunk_overlap: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: 0.20,
            chunk_size: 800,
            chunk_overlap: 150,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    gateway: Option<GatewayConfig>,
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingConfig>,
    retrieval: Option<RetrievalConfig>,
    logging: Option<LoggingSection>,
    limits: Option<LimitsSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LimitsSection {
    #[serde(rename = "requestTimeoutSecs")]
    request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            llm_endpoint: None,
            gateway: GatewayConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            request_timeout_secs: 30,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `SAFECHAT_WORKSPACE`: Override workspace path
    /// - `SAFECHAT_CONFIG`: Path to config file
    /// - `SAFECHAT_PROVIDER`: Completion provider
    /// - `SAFECHAT_MODEL`: Completion model
    /// - `SAFECHAT_GATEWAY_URL`: Gateway prompts endpoint
    /// - `SAFECHAT_GATEWAY_PROJECT`: Gateway project identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("SAFECHAT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("SAFECHAT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if it exists
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".safechat/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
            tracing::debug!("Merged config file {:?}", config_path);
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("SAFECHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("SAFECHAT_MODEL") {
            config.model = model;
        }

        if let Ok(endpoint) = std::env::var("SAFECHAT_GATEWAY_URL") {
            config.gateway.endpoint = endpoint;
        }

        if let Ok(project) = std::env::var("SAFECHAT_GATEWAY_PROJECT") {
            config.gateway.project = project;
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(gateway) = config_file.gateway {
            result.gateway = gateway;
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.llm_endpoint = llm.endpoint;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(limits) = config_file.limits {
            if let Some(secs) = limits.request_timeout_secs {
                result.request_timeout_secs = secs;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .safechat directory.
    pub fn safechat_dir(&self) -> PathBuf {
        self.workspace.join(".safechat")
    }

    /// Ensure the .safechat directory exists.
    pub fn ensure_safechat_dir(&self) -> AppResult<()> {
        let dir = self.safechat_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .safechat directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path to the SQLite knowledge index.
    pub fn index_path(&self) -> PathBuf {
        self.safechat_dir().join("index.db")
    }

    /// Path to the append-only audit log.
    pub fn audit_log_path(&self) -> PathBuf {
        self.safechat_dir().join("audit.jsonl")
    }

    /// Resolve the gateway bearer token from the configured environment variable.
    pub fn resolve_gateway_token(&self) -> Option<String> {
        std::env::var(&self.gateway.token_env).ok()
    }

    /// Validate configuration for online gateway use.
    pub fn validate_gateway(&self) -> AppResult<()> {
        if self.gateway.endpoint.is_empty() {
            return Err(AppError::Config(
                "Gateway endpoint is not configured. Set SAFECHAT_GATEWAY_URL or \
                 gateway.endpoint in .safechat/config.yaml, or run with --offline."
                    .to_string(),
            ));
        }

        if self.gateway.project.is_empty() {
            return Err(AppError::Config(
                "Gateway project is not configured. Set SAFECHAT_GATEWAY_PROJECT or \
                 gateway.project in .safechat/config.yaml."
                    .to_string(),
            ));
        }

        if self.resolve_gateway_token().is_none() {
            return Err(AppError::Config(format!(
                "Gateway token not found in environment variable: {}",
                self.gateway.token_env
            )));
        }

        Ok(())
    }
}
