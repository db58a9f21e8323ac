use serde::{Deserialize, Serialize};

/// A single prompt passed to an LLM provider.
///
/// The bot only ever makes one-shot calls, so there is no history: a system
/// prompt, the current message, and sampling knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    /// System prompt. Empty = none.
    pub system_prompt: String,
    /// The prompt body sent as the user turn.
    pub current_message: String,
    /// Sampling temperature. `None` = provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens. `None` = provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Override the provider's configured model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A structured message for API-based providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl Context {
    /// Create a context with just a user message.
    pub fn new(message: &str) -> Self {
        Self {
            current_message: message.to_string(),
            ..Default::default()
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: &str) -> Self {
        self.system_prompt = system.to_string();
        self
    }

    /// Set temperature and token budget.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Convert context to structured API messages.
    ///
    /// Returns `(system_prompt, messages)`. The system prompt is separated
    /// because Gemini takes it outside the contents array.
    pub fn to_api_messages(&self) -> (String, Vec<ApiMessage>) {
        let messages = vec![ApiMessage {
            role: "user".to_string(),
            content: self.current_message.clone(),
        }];
        (self.system_prompt.clone(), messages)
    }
}
