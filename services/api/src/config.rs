use course_architect_core::pipeline::ArchitectStrategy;
use course_architect_core::provider::{ProviderCredentials, ProviderError, ProviderMode};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Where the course graph is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphBackend {
    Neo4j,
    /// Process memory; nothing survives a restart.
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub graph_backend: GraphBackend,
    pub neo4j_uri: String,
    pub neo4j_username: String,
    pub neo4j_password: String,
    pub llm_mode: ProviderMode,
    pub llm_credentials: ProviderCredentials,
    /// Temperature for prose generation. Structural generation always uses 0.
    pub llm_temperature: f32,
    pub architect_strategy: ArchitectStrategy,
    pub log_level: Level,
    /// Directory of `*.md` templates overriding the built-in prompts.
    pub prompts_path: Option<PathBuf>,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let graph_backend = match var_or("GRAPH_BACKEND", "neo4j").to_lowercase().as_str() {
            "neo4j" => GraphBackend::Neo4j,
            "memory" => GraphBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "GRAPH_BACKEND".to_string(),
                    format!("'{}' is not one of: neo4j, memory", other),
                ));
            }
        };

        let neo4j_uri = var_or("NEO4J_URI", "bolt://localhost:7687");
        let neo4j_username = var_or("NEO4J_USERNAME", "neo4j");
        let neo4j_password = var_or("NEO4J_PASSWORD", "password");

        let llm_mode = var_or("LLM_MODE", "local").parse::<ProviderMode>()?;
        let llm_credentials = llm_mode.credentials_from_env()?;

        let temperature_str = var_or("LLM_TEMPERATURE", "0.5");
        let llm_temperature = temperature_str
            .parse::<f32>()
            .ok()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "LLM_TEMPERATURE".to_string(),
                    format!("'{}' is not a non-negative number", temperature_str),
                )
            })?;

        let architect_strategy = var_or("ARCHITECT_STRATEGY", "structured")
            .parse::<ArchitectStrategy>()
            .map_err(|e| ConfigError::InvalidValue("ARCHITECT_STRATEGY".to_string(), e))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH").ok().map(PathBuf::from);

        Ok(Self {
            bind_address,
            graph_backend,
            neo4j_uri,
            neo4j_username,
            neo4j_password,
            llm_mode,
            llm_credentials,
            llm_temperature,
            architect_strategy,
            log_level,
            prompts_path,
        })
    }
}
