//! Google Gemini API provider.
//!
//! Calls the Gemini `generateContent` endpoint. Auth via the `x-goog-api-key`
//! header, never the URL, so transport errors cannot leak the key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use taskbot_core::{
    config::GeminiConfig,
    context::{ApiMessage, Context},
    error::TaskbotError,
    message::{Completion, CompletionMetadata},
    traits::Provider,
};
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
        }
    }

    /// Point at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build from config. Returns `None` when no API key is set.
    pub fn from_config(config: &GeminiConfig) -> Option<Self> {
        if config.api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(config.api_key.clone(), config.model.clone()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    total_token_count: u64,
}

impl GeminiResponse {
    fn first_text(&self) -> Option<String> {
        self.candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.clone())
    }
}

/// Gemini calls the assistant role "model".
fn to_gemini_contents(api_messages: &[ApiMessage]) -> Vec<GeminiContent> {
    api_messages
        .iter()
        .map(|m| {
            let role = if m.role == "assistant" { "model" } else { "user" };
            GeminiContent {
                role: Some(role.to_string()),
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            }
        })
        .collect()
}

fn build_request(context: &Context) -> GeminiRequest {
    let (system, api_messages) = context.to_api_messages();

    let system_instruction = (!system.is_empty()).then(|| GeminiContent {
        role: None,
        parts: vec![GeminiPart { text: system }],
    });

    let generation_config = (context.temperature.is_some() || context.max_tokens.is_some())
        .then_some(GenerationConfig {
            temperature: context.temperature,
            max_output_tokens: context.max_tokens,
        });

    GeminiRequest {
        contents: to_gemini_contents(&api_messages),
        system_instruction,
        generation_config,
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<Completion, TaskbotError> {
        let effective_model = context.model.as_deref().unwrap_or(&self.model);
        let start = Instant::now();
        let body = build_request(context);

        let url = format!(
            "{}/models/{effective_model}:generateContent",
            self.base_url.trim_end_matches('/')
        );
        debug!("gemini: POST models/{effective_model}:generateContent");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                TaskbotError::Provider(format!("gemini request failed: {}", e.without_url()))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TaskbotError::Provider(format!(
                "gemini returned {status}: {text}"
            )));
        }

        let parsed: GeminiResponse = resp.json().await.map_err(|e| {
            TaskbotError::Provider(format!(
                "gemini: failed to parse response: {}",
                e.without_url()
            ))
        })?;

        Ok(Completion {
            text: parsed.first_text().unwrap_or_default(),
            metadata: CompletionMetadata {
                provider_used: "gemini".to_string(),
                tokens_used: parsed.usage_metadata.as_ref().map(|u| u.total_token_count),
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: Some(effective_model.to_string()),
            },
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("gemini: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("gemini not available: {}", e.without_url());
                false
            }
        }
    }
}
