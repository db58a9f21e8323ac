//! OpenAI-compatible chat completions provider.
//!
//! Works with OpenAI's API and any endpoint that speaks the same
//! `/chat/completions` dialect.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use taskbot_core::{
    config::OpenAiConfig,
    context::{ApiMessage, Context},
    error::TaskbotError,
    message::{Completion, CompletionMetadata},
    traits::Provider,
};
use tracing::{debug, warn};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    /// Build from config. Returns `None` when no API key is set.
    pub fn from_config(config: &OpenAiConfig) -> Option<Self> {
        if config.api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
        ))
    }
}

/// Build OpenAI-format messages from context (system as a message role).
fn build_openai_messages(system: &str, api_messages: &[ApiMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(api_messages.len() + 1);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    messages.extend(api_messages.iter().map(|m| ChatMessage {
        role: m.role.clone(),
        content: m.content.clone(),
    }));
    messages
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

impl ChatCompletionResponse {
    fn first_text(&self) -> Option<String> {
        self.choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<Completion, TaskbotError> {
        let (system, api_messages) = context.to_api_messages();
        let effective_model = context.model.as_deref().unwrap_or(&self.model);
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: effective_model.to_string(),
            messages: build_openai_messages(&system, &api_messages),
            temperature: context.temperature,
            max_tokens: context.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={effective_model}");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                TaskbotError::Provider(format!("openai request failed: {}", e.without_url()))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TaskbotError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| {
            TaskbotError::Provider(format!(
                "openai: failed to parse response: {}",
                e.without_url()
            ))
        })?;

        // An empty body is a valid answer; callers apply their own fallbacks.
        let text = parsed.first_text().unwrap_or_default();

        Ok(Completion {
            text,
            metadata: CompletionMetadata {
                provider_used: "openai".to_string(),
                tokens_used: parsed.usage.as_ref().and_then(|u| u.total_tokens),
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: parsed.model,
            },
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {}", e.without_url());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_key() {
        let mut cfg = OpenAiConfig::default();
        assert!(OpenAiProvider::from_config(&cfg).is_none());

        cfg.api_key = "  ".into();
        assert!(OpenAiProvider::from_config(&cfg).is_none());

        cfg.api_key = "sk-test".into();
        let p = OpenAiProvider::from_config(&cfg).unwrap();
        assert_eq!(p.name(), "openai");
        assert_eq!(p.model, "gpt-4o-mini");
        assert!(p.requires_api_key());
    }

    #[test]
    fn test_build_openai_messages() {
        let ctx = Context::new("Task list:\n1. milk").with_system("classify");
        let (system, api_msgs) = ctx.to_api_messages();
        let messages = build_openai_messages(&system, &api_msgs);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "classify");
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_build_openai_messages_empty_system() {
        let (system, api_msgs) = Context::new("Hi").to_api_messages();
        let messages = build_openai_messages(&system, &api_msgs);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_request_carries_sampling() {
        let body = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![],
            temperature: Some(0.0),
            max_tokens: Some(100),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["max_tokens"], 100);

        let bare = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![],
            temperature: None,
            max_tokens: None,
        };
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_openai_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"{\"taskNumber\":1}"},"finish_reason":"stop"}],"model":"gpt-4o-mini","usage":{"total_tokens":42,"prompt_tokens":10,"completion_tokens":32}}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_text(), Some("{\"taskNumber\":1}".into()));
        assert_eq!(resp.usage.as_ref().and_then(|u| u.total_tokens), Some(42));
    }

    #[test]
    fn test_openai_response_without_choices() {
        let resp: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(resp.first_text().is_none());
    }
}
