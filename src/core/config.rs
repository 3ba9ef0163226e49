//! Configuration management for the LLM gateway.
//!
//! This module handles loading and parsing configuration from YAML files,
//! with support for environment variable expansion.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// List of upstream model configurations
    pub models: Vec<ModelConfig>,

    /// Server configuration (host, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Request timeout in seconds for upstream providers
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Configuration for a single upstream model.
///
/// A model groups one or more API keys behind one capacity strategy; the
/// key set and strategy type are fixed for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (unique, used in routing and introspection)
    pub name: String,

    /// Base URL of the provider's OpenAI-compatible API
    pub api_base: String,

    /// Model identifier sent to the upstream provider
    pub upstream_model: String,

    /// Credentials for this model, each with a traffic weight
    pub api_keys: Vec<ApiKeyConfig>,

    /// Weight for cross-model selection (higher = more likely to be selected)
    #[serde(default = "default_weight")]
    pub model_weight: f64,

    /// Capacity strategy and its parameters
    pub strategy: StrategyConfig,
}

/// One API credential with its intra-model traffic weight.
///
/// Traffic share for two keys of weight `w1`, `w2` is `w1/(w1+w2)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    /// The credential string (opaque to the gateway)
    pub key: String,

    /// Weight for intra-model selection
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Capacity strategy parameters, tagged by strategy type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Bound the number of simultaneous in-flight requests per key
    Concurrency { max_concurrency: u32 },

    /// Bound the number of admissions per key per rolling 1-second window
    Qps { max_qps: u32 },
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_weight() -> f64 {
    1.0
}

fn default_request_timeout() -> u64 {
    300
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use llm_gateway_rust::core::config::AppConfig;
    ///
    /// let config = AppConfig::load("config.yaml").expect("Failed to load config");
    /// ```
    pub fn load(path: &str) -> Result<Self> {
        // Load .env file if it exists (skip in tests to avoid interference)
        #[cfg(not(test))]
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        // Expand environment variables
        let expanded = expand_env_vars(&content);

        let mut config: AppConfig = serde_yaml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        // Override with environment variables (env vars take precedence)

        // Server host override
        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }

        // Server port override
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                config.server.port = port;
            }
        }

        // Request timeout override
        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                config.request_timeout_secs = timeout;
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Weights must be finite and non-negative; limits must be at least 1;
    /// every model needs at least one key and a unique name.
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            bail!("Configuration must define at least one model");
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name.as_str()) {
                bail!("Duplicate model name: {}", model.name);
            }
            if model.api_keys.is_empty() {
                bail!("Model {} must define at least one api_key", model.name);
            }
            if !model.model_weight.is_finite() || model.model_weight < 0.0 {
                bail!(
                    "Model {} has invalid model_weight {}",
                    model.name,
                    model.model_weight
                );
            }
            for key in &model.api_keys {
                if key.key.is_empty() {
                    bail!("Model {} has an empty api_key entry", model.name);
                }
                if !key.weight.is_finite() || key.weight < 0.0 {
                    bail!(
                        "Model {} key has invalid weight {}",
                        model.name,
                        key.weight
                    );
                }
            }
            match model.strategy {
                StrategyConfig::Concurrency { max_concurrency } => {
                    if max_concurrency == 0 {
                        bail!("Model {} must set max_concurrency >= 1", model.name);
                    }
                }
                StrategyConfig::Qps { max_qps } => {
                    if max_qps == 0 {
                        bail!("Model {} must set max_qps >= 1", model.name);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Expand environment variables in configuration content.
///
/// Supports patterns: ${VAR}, ${VAR:-default}, ${VAR:default}
fn expand_env_vars(content: &str) -> String {
    let re = Regex::new(r#"["']?\$\{([^}:]+)(?::?-?([^}]*))?\}["']?"#).unwrap();

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
    })
    .to_string()
}
