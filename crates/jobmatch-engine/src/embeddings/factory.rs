//! Config-driven provider construction
//!
//! [`global_provider`] memoizes one provider per process; validation happens
//! before the provider is published, so a dimension mismatch fails at startup
//! rather than on the first task.

use std::sync::{Arc, OnceLock};

use super::EmbeddingProvider;
use crate::config::{EmbeddingProviderKind, EmbeddingSettings};
use crate::errors::{EngineError, Result};

/// Construct an embedding provider from settings.
pub fn create_provider(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match settings.provider {
        EmbeddingProviderKind::LocalHash => {
            Arc::new(super::HashingProvider::new(settings.dimension))
        }

        EmbeddingProviderKind::FastEmbed => {
            #[cfg(feature = "fastembed")]
            {
                Arc::new(
                    super::FastEmbedProvider::new(settings.model_name.as_deref())
                        .map_err(|e| EngineError::Embedding(e.to_string()))?,
                )
            }
            #[cfg(not(feature = "fastembed"))]
            {
                return Err(EngineError::Config(
                    "EMBEDDING_PROVIDER=fastembed requires building with the `fastembed` feature"
                        .to_string(),
                ));
            }
        }

        EmbeddingProviderKind::OpenAi => {
            #[cfg(feature = "openai")]
            {
                Arc::new(
                    super::OpenAiProvider::new(settings.model_name.as_deref(), settings.dimension)
                        .map_err(|e| EngineError::Embedding(e.to_string()))?,
                )
            }
            #[cfg(not(feature = "openai"))]
            {
                return Err(EngineError::Config(
                    "EMBEDDING_PROVIDER=openai requires building with the `openai` feature"
                        .to_string(),
                ));
            }
        }
    };

    if provider.dimensions() != settings.dimension {
        return Err(EngineError::Config(format!(
            "Embedding dimension mismatch: provider {} produces {}-dim vectors, EMBEDDING_DIM={}",
            provider.name(),
            provider.dimensions(),
            settings.dimension
        )));
    }

    Ok(provider)
}

/// Process-wide memoized provider.
///
/// The first successful construction wins; concurrent racers may build a
/// second provider that is immediately dropped.
pub fn global_provider(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    static PROVIDER: OnceLock<Arc<dyn EmbeddingProvider>> = OnceLock::new();

    if let Some(provider) = PROVIDER.get() {
        return Ok(provider.clone());
    }

    let provider = create_provider(settings)?;
    Ok(PROVIDER.get_or_init(|| provider).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhash_construction() {
        let settings = EmbeddingSettings::default();
        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.dimensions(), 384);
        assert!(provider.name().starts_with("localhash:"));
    }

    #[test]
    fn test_localhash_custom_dimension() {
        let settings = EmbeddingSettings {
            dimension: 128,
            ..Default::default()
        };
        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.dimensions(), 128);
    }

    #[cfg(not(feature = "fastembed"))]
    #[test]
    fn test_fastembed_requires_feature() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProviderKind::FastEmbed,
            ..Default::default()
        };
        let err = create_provider(&settings).unwrap_err();
        assert!(err.to_string().contains("fastembed"));
    }

    #[test]
    fn test_global_provider_is_memoized() {
        let settings = EmbeddingSettings::default();
        let first = global_provider(&settings).unwrap();
        let second = global_provider(&settings).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
