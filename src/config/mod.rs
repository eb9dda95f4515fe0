//! Configuration management for finsearch
//!
//! Loads the TOML configuration, applies `FINSEARCH_SECTION__KEY` environment
//! overrides, and validates the result before any engine is constructed.

use crate::error::{FinsearchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Schema version understood by this build
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub semantic: SemanticConfig,
    pub hybrid: HybridConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Corpus store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite corpus database
    pub database_path: PathBuf,
    /// Maximum pooled read-only connections
    pub pool_size: u32,
    /// Register the built-in `vec_distance_cosine` function on each connection
    pub register_distance_function: bool,
}

/// Request defaults shared by all engines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_limit: usize,
}

/// Embedding provider and vector search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    pub model: String,
    pub dimensions: usize,
    pub endpoint: String,
    /// Name of the environment variable holding the provider credential
    pub api_key_env: String,
}

/// Hybrid fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    pub keyword_weight: f64,
    pub semantic_weight: f64,
    pub normalize_scores: bool,
    pub overfetch_multiplier: usize,
    pub overfetch_cap: usize,
    pub concurrent_fanout: bool,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize_scores: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FinsearchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FinsearchError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| FinsearchError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| FinsearchError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(weight) = overrides.keyword_weight {
            self.hybrid.keyword_weight = weight;
        }
        if let Some(weight) = overrides.semantic_weight {
            self.hybrid.semantic_weight = weight;
        }
        if let Some(normalize) = overrides.normalize_scores {
            self.hybrid.normalize_scores = normalize;
        }
        if let Some(model) = overrides.embedding_model {
            self.semantic.model = model;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: FINSEARCH_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("FINSEARCH_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATABASE_PATH" => {
                self.storage.database_path = PathBuf::from(value);
            }
            "SEMANTIC__MODEL" => {
                self.semantic.model = value.to_string();
            }
            "SEMANTIC__ENDPOINT" => {
                self.semantic.endpoint = value.to_string();
            }
            "SEMANTIC__API_KEY_ENV" => {
                self.semantic.api_key_env = value.to_string();
            }
            "HYBRID__KEYWORD_WEIGHT" => {
                self.hybrid.keyword_weight = parse_env(path, value)?;
            }
            "HYBRID__SEMANTIC_WEIGHT" => {
                self.hybrid.semantic_weight = parse_env(path, value)?;
            }
            "HYBRID__CONCURRENT_FANOUT" => {
                self.hybrid.concurrent_fanout = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            FinsearchError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("finsearch").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| FinsearchError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                database_path: PathBuf::from("db/company_metadata_and_docs.sqlite"),
                pool_size: 8,
                register_distance_function: true,
            },
            search: SearchConfig { default_limit: 10 },
            semantic: SemanticConfig {
                model: "text-embedding-3-small".to_string(),
                dimensions: 1536,
                endpoint: "https://api.openai.com/v1/embeddings".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
            },
            hybrid: HybridConfig {
                keyword_weight: 0.3,
                semantic_weight: 0.7,
                normalize_scores: true,
                overfetch_multiplier: 3,
                overfetch_cap: 100,
                concurrent_fanout: true,
            },
            profiles: HashMap::new(),
        }
    }
}
