//! Environment-driven configuration
//!
//! All knobs are read once at startup via [`AppConfig::from_env`] and
//! validated eagerly: a missing `HH_USER_AGENT` or an embedding dimension
//! mismatch should abort the process before any task runs.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

/// Default embedding dimension (all-MiniLM-class models).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Default beat interval for saved-search syncs, in minutes.
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u32 = 5;

/// Supported embedding provider kinds
///
/// Providers that cannot implement the full capability set
/// (`name`, `dimensions`, `embed`, `embed_batch`) are not registered here;
/// asking for one yields a configuration error naming the supported set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic blake2b token-hashing embedder (no model download)
    #[default]
    LocalHash,
    /// Local ONNX models via fastembed (requires the `fastembed` feature)
    FastEmbed,
    /// OpenAI embeddings API (requires the `openai` feature)
    OpenAi,
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalHash => write!(f, "localhash"),
            Self::FastEmbed => write!(f, "fastembed"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for EmbeddingProviderKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "localhash" | "local-hash" | "local_hash" => Ok(Self::LocalHash),
            "fastembed" | "fast-embed" | "fast_embed" => Ok(Self::FastEmbed),
            "openai" | "open-ai" | "open_ai" => Ok(Self::OpenAi),
            other => Err(EngineError::Config(format!(
                "Unsupported embedding provider: {other}. Registered providers: localhash, fastembed, openai"
            ))),
        }
    }
}

/// Embedding subsystem settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Which provider to construct
    pub provider: EmbeddingProviderKind,

    /// Provider-specific model identifier (ignored by `localhash`)
    pub model_name: Option<String>,

    /// Expected vector dimension; every provider must match it
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::LocalHash,
            model_name: None,
            dimension: DEFAULT_EMBEDDING_DIM,
        }
    }
}

/// Job-board client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HhSettings {
    /// Base URL of the job-board API
    pub base_url: String,

    /// Required identification header; the client refuses to start without it
    pub user_agent: Option<String>,
}

impl Default for HhSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.hh.ru".to_string(),
            user_agent: None,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database path or `sqlite:` URL
    pub database_url: String,

    /// Embedding subsystem settings
    pub embedding: EmbeddingSettings,

    /// Job-board client settings
    pub hh: HhSettings,

    /// Beat interval for saved-search syncs, in minutes
    pub sync_interval_minutes: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "jobmatch.db".to_string(),
            embedding: EmbeddingSettings::default(),
            hh: HhSettings::default(),
            sync_interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// Recognized variables: `DATABASE_URL`, `EMBEDDING_PROVIDER`,
    /// `EMBEDDING_MODEL_NAME`, `EMBEDDING_DIM`, `HH_BASE_URL`,
    /// `HH_USER_AGENT`, `SAVED_SEARCH_SYNC_INTERVAL_MINUTES`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider.parse()?;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL_NAME") {
            if !model.trim().is_empty() {
                config.embedding.model_name = Some(model);
            }
        }
        if let Ok(dim) = std::env::var("EMBEDDING_DIM") {
            config.embedding.dimension = dim.parse().map_err(|_| {
                EngineError::Config(format!("EMBEDDING_DIM must be a positive integer, got: {dim}"))
            })?;
        }
        if let Ok(base_url) = std::env::var("HH_BASE_URL") {
            config.hh.base_url = base_url;
        }
        if let Ok(user_agent) = std::env::var("HH_USER_AGENT") {
            if !user_agent.trim().is_empty() {
                config.hh.user_agent = Some(user_agent);
            }
        }
        if let Ok(minutes) = std::env::var("SAVED_SEARCH_SYNC_INTERVAL_MINUTES") {
            config.sync_interval_minutes = minutes.parse().map_err(|_| {
                EngineError::Config(format!(
                    "SAVED_SEARCH_SYNC_INTERVAL_MINUTES must be a positive integer, got: {minutes}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(EngineError::Config(
                "EMBEDDING_DIM must be greater than zero".to_string(),
            ));
        }
        if self.sync_interval_minutes == 0 {
            return Err(EngineError::Config(
                "SAVED_SEARCH_SYNC_INTERVAL_MINUTES must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The user agent, or a configuration error for ingestion paths.
    pub fn require_user_agent(&self) -> Result<&str> {
        self.hh.user_agent.as_deref().ok_or_else(|| {
            EngineError::Config("HH_USER_AGENT environment variable is required".to_string())
        })
    }

    /// Cron expression for the saved-search beat (second-resolution syntax).
    pub fn beat_cron(&self) -> String {
        format!("0 */{} * * * *", self.sync_interval_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!(
            "localhash".parse::<EmbeddingProviderKind>().unwrap(),
            EmbeddingProviderKind::LocalHash
        );
        assert_eq!(
            "fastembed".parse::<EmbeddingProviderKind>().unwrap(),
            EmbeddingProviderKind::FastEmbed
        );
        assert_eq!(
            "openai".parse::<EmbeddingProviderKind>().unwrap(),
            EmbeddingProviderKind::OpenAi
        );
    }

    #[test]
    fn test_unregistered_provider_is_rejected() {
        let err = "sbert".parse::<EmbeddingProviderKind>().unwrap_err();
        assert!(err.to_string().contains("Registered providers"));

        assert!("gigachat".parse::<EmbeddingProviderKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.sync_interval_minutes, 5);
        assert_eq!(config.hh.base_url, "https://api.hh.ru");
    }

    #[test]
    fn test_beat_cron() {
        let config = AppConfig {
            sync_interval_minutes: 7,
            ..Default::default()
        };
        assert_eq!(config.beat_cron(), "0 */7 * * * *");
    }

    #[test]
    fn test_user_agent_required() {
        let config = AppConfig::default();
        assert!(config.require_user_agent().is_err());

        let config = AppConfig {
            hh: HhSettings {
                user_agent: Some("jobmatch/0.3 (test@example.com)".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.require_user_agent().unwrap(),
            "jobmatch/0.3 (test@example.com)"
        );
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = AppConfig {
            embedding: EmbeddingSettings {
                dimension: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
