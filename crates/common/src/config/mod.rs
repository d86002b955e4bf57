//! Configuration management for LexForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Knowledge base document paths
    pub knowledge: KnowledgeConfig,

    /// Retrieval tuning parameters
    pub retrieval: RetrievalConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Entity tagger configuration
    pub tagger: TaggerConfig,

    /// Generative backend configuration
    pub generation: GenerationConfig,

    /// Result publication configuration
    pub publish: PublishConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnowledgeConfig {
    /// Categories + provisions document
    #[serde(default = "default_categories_path")]
    pub categories_path: String,

    /// Interpretation definitions document
    #[serde(default = "default_definitions_path")]
    pub definitions_path: String,

    /// Schedules document
    #[serde(default = "default_schedules_path")]
    pub schedules_path: String,

    /// Subsidiary legislation mapping document
    #[serde(default = "default_subsidiary_path")]
    pub subsidiary_path: String,
}

/// Retrieval tuning. Threshold, cutoffs, and scoring weights are policy,
/// not constants; ranking tests assert relative order only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a category to match
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Maximum categories selected in layer 1
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,

    /// Maximum extracted key terms
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,

    /// Score weight per exact occurrence of a term in the query
    #[serde(default = "default_occurrence_weight")]
    pub occurrence_weight: f32,

    /// Score bonus for terms found by the lexical layer
    #[serde(default = "default_lexical_bonus")]
    pub lexical_bonus: f32,

    /// Score bonus for terms found by the entity tagger
    #[serde(default = "default_tagger_bonus")]
    pub tagger_bonus: f32,

    /// Score bonus for curated high-priority terms
    #[serde(default = "default_priority_bonus")]
    pub priority_bonus: f32,

    /// Score bonus for terms naming a data type
    #[serde(default = "default_data_indicator_bonus")]
    pub data_indicator_bonus: f32,

    /// Score bonus for multi-word terms
    #[serde(default = "default_specificity_bonus")]
    pub specificity_bonus: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: http, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaggerConfig {
    /// Tagger provider: http, mock
    #[serde(default = "default_tagger_provider")]
    pub provider: String,

    /// API base URL for the inference endpoint
    pub api_base: Option<String>,

    /// Minimum model confidence for a span to be kept
    #[serde(default = "default_tagger_confidence")]
    pub min_confidence: f32,

    /// Request timeout in seconds
    #[serde(default = "default_tagger_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Generation provider: http, mock
    #[serde(default = "default_generation_provider")]
    pub provider: String,

    /// API key for the generation backend
    pub api_key: Option<String>,

    /// API base URL
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Maximum output tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Bounded wait for a single generation call
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Re-prompts allowed after malformed output before surfacing an error
    #[serde(default = "default_format_retries")]
    pub max_format_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Optional path for the atomically replaced result document
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_categories_path() -> String { "data/categories.json".to_string() }
fn default_definitions_path() -> String { "data/definitions.json".to_string() }
fn default_schedules_path() -> String { "data/schedules.json".to_string() }
fn default_subsidiary_path() -> String { "data/subsidiary.json".to_string() }
fn default_similarity_threshold() -> f32 { 0.3 }
fn default_max_categories() -> usize { 3 }
fn default_max_terms() -> usize { 15 }
fn default_occurrence_weight() -> f32 { 3.0 }
fn default_lexical_bonus() -> f32 { 2.0 }
fn default_tagger_bonus() -> f32 { 2.0 }
fn default_priority_bonus() -> f32 { 3.0 }
fn default_data_indicator_bonus() -> f32 { 1.0 }
fn default_specificity_bonus() -> f32 { 1.0 }
fn default_embedding_provider() -> String { "http".to_string() }
fn default_embedding_model() -> String { "all-MiniLM-L6-v2".to_string() }
fn default_embedding_dimension() -> usize { 384 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_tagger_provider() -> String { "http".to_string() }
fn default_tagger_confidence() -> f32 { 0.6 }
fn default_tagger_timeout() -> u64 { 30 }
fn default_generation_provider() -> String { "http".to_string() }
fn default_generation_model() -> String { "gpt-4o-mini".to_string() }
fn default_max_output_tokens() -> usize { 8192 }
fn default_temperature() -> f32 { 0.3 }
fn default_generation_timeout() -> u64 { 60 }
fn default_format_retries() -> u32 { 1 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "lexforge".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the bounded generation wait as Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            knowledge: KnowledgeConfig {
                categories_path: default_categories_path(),
                definitions_path: default_definitions_path(),
                schedules_path: default_schedules_path(),
                subsidiary_path: default_subsidiary_path(),
            },
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig {
                provider: default_embedding_provider(),
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_embedding_retries(),
            },
            tagger: TaggerConfig {
                provider: default_tagger_provider(),
                api_base: None,
                min_confidence: default_tagger_confidence(),
                timeout_secs: default_tagger_timeout(),
            },
            generation: GenerationConfig {
                provider: default_generation_provider(),
                api_key: None,
                api_base: None,
                model: default_generation_model(),
                max_output_tokens: default_max_output_tokens(),
                temperature: default_temperature(),
                timeout_secs: default_generation_timeout(),
                max_format_retries: default_format_retries(),
            },
            publish: PublishConfig { output_path: None },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_categories: default_max_categories(),
            max_terms: default_max_terms(),
            occurrence_weight: default_occurrence_weight(),
            lexical_bonus: default_lexical_bonus(),
            tagger_bonus: default_tagger_bonus(),
            priority_bonus: default_priority_bonus(),
            data_indicator_bonus: default_data_indicator_bonus(),
            specificity_bonus: default_specificity_bonus(),
        }
    }
}
