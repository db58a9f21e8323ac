//! # taskbot-providers
//!
//! Hosted LLM backends for taskbot.

pub mod gemini;
pub mod openai;

use std::sync::Arc;
use taskbot_core::{config::ProviderConfig, traits::Provider};

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Build the named provider from config.
///
/// Returns `None` for an unknown name or when the provider has no API key,
/// so callers can fall back or skip the feature.
pub fn build_provider(name: &str, config: &ProviderConfig) -> Option<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match name {
        "openai" => Arc::new(OpenAiProvider::from_config(&config.openai)?),
        "gemini" => Arc::new(GeminiProvider::from_config(&config.gemini)?),
        _ => return None,
    };
    Some(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_provider_needs_key() {
        let mut cfg = ProviderConfig::default();
        assert!(build_provider("openai", &cfg).is_none());
        assert!(build_provider("gemini", &cfg).is_none());

        cfg.openai.api_key = "sk-test".into();
        cfg.gemini.api_key = "AIza-test".into();
        assert_eq!(build_provider("openai", &cfg).unwrap().name(), "openai");
        assert_eq!(build_provider("gemini", &cfg).unwrap().name(), "gemini");
        assert!(build_provider("ollama", &cfg).is_none());
    }
}
