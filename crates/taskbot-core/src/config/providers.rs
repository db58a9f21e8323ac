use serde::{Deserialize, Serialize};

use super::defaults::*;

/// How the bot answers replies to its own messages.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStyle {
    /// Classify silently, confirm completions with a plain line.
    #[default]
    Plain,
    /// Answer every reply with a generated sarcastic line.
    Sarcastic,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider used for reply analysis ("openai" or "gemini").
    #[serde(default = "default_analyzer")]
    pub analyzer: String,
    /// Provider used for generated reminders ("openai" or "gemini").
    #[serde(default = "default_nagger")]
    pub nagger: String,
    #[serde(default)]
    pub reply_style: ReplyStyle,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            analyzer: default_analyzer(),
            nagger: default_nagger(),
            reply_style: ReplyStyle::default(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// OpenAI-compatible provider config. Empty `api_key` = disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_openai_model(),
            base_url: default_openai_base_url(),
        }
    }
}

/// Google Gemini provider config. Empty `api_key` = disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
        }
    }
}
