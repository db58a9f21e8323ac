//! LLM-backed helpers: reply analysis, sarcastic replies, and nag lines.
//!
//! Both providers are optional. A missing provider degrades each call to a
//! harmless default instead of an error.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use taskbot_core::{
    config::{ProviderConfig, Prompts},
    context::Context,
    error::TaskbotError,
    sanitize::sanitize,
    traits::Provider,
};
use taskbot_memory::Task;
use tracing::{debug, info, warn};

use crate::format::numbered_descriptions;

/// Outcome of classifying a user's reply against the task list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyAnalysis {
    #[serde(default, deserialize_with = "lenient_number")]
    pub task_number: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub should_complete: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
}

impl ReplyAnalysis {
    fn fallback(summary: &str) -> Self {
        Self {
            task_number: None,
            should_complete: false,
            summary: summary.to_string(),
        }
    }

    /// The task to complete, if the analysis names one and says it is done.
    pub fn completed_task(&self) -> Option<i64> {
        match self.task_number {
            Some(n) if self.should_complete && n >= 1 => Some(n),
            _ => None,
        }
    }
}

/// A generated answer to a reply, optionally naming a task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarcasticReply {
    #[serde(default, deserialize_with = "lenient_text")]
    pub reply: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub task_number: Option<i64>,
}

// Models are loose with JSON types. Accept `2`, `2.0` and `"2"` as numbers,
// and null for any field.

fn lenient_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "0" | "no" | "null"
        ),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Owns the analyzer and nagger providers plus their prompts.
pub struct Assistant {
    analyzer: Option<Arc<dyn Provider>>,
    nagger: Option<Arc<dyn Provider>>,
    prompts: Prompts,
}

impl Assistant {
    pub fn new(
        analyzer: Option<Arc<dyn Provider>>,
        nagger: Option<Arc<dyn Provider>>,
        prompts: Prompts,
    ) -> Self {
        Self {
            analyzer,
            nagger,
            prompts,
        }
    }

    /// Build from config. The nagger falls back to OpenAI when its own
    /// provider has no key.
    pub fn from_config(config: &ProviderConfig, prompts: Prompts) -> Self {
        let analyzer = taskbot_providers::build_provider(&config.analyzer, config);
        let nagger = taskbot_providers::build_provider(&config.nagger, config)
            .or_else(|| taskbot_providers::build_provider("openai", config));

        info!(
            "assistant: analyzer={} nagger={}",
            analyzer.as_ref().map_or("disabled", |p| p.name()),
            nagger.as_ref().map_or("disabled", |p| p.name()),
        );
        Self::new(analyzer, nagger, prompts)
    }

    pub fn has_analyzer(&self) -> bool {
        self.analyzer.is_some()
    }

    pub fn has_nagger(&self) -> bool {
        self.nagger.is_some()
    }

    pub fn analyzer_name(&self) -> Option<&str> {
        self.analyzer.as_deref().map(|p| p.name())
    }

    pub fn nagger_name(&self) -> Option<&str> {
        self.nagger.as_deref().map(|p| p.name())
    }

    pub fn analyzer(&self) -> Option<&Arc<dyn Provider>> {
        self.analyzer.as_ref()
    }

    pub fn nagger(&self) -> Option<&Arc<dyn Provider>> {
        self.nagger.as_ref()
    }

    /// Notice sent when a chat talks past the hourly threshold.
    pub fn chatter_notice(&self) -> &str {
        &self.prompts.chatter
    }

    /// Decide whether a reply marks one of `tasks` as done.
    pub async fn analyze_reply(
        &self,
        message: &str,
        tasks: &[Task],
    ) -> Result<ReplyAnalysis, TaskbotError> {
        let Some(provider) = &self.analyzer else {
            return Ok(ReplyAnalysis::fallback("AI not configured"));
        };

        let user = format!(
            "Task list:\n{}\n\nUser message: \"{}\"",
            numbered_descriptions(tasks),
            clean_input(message)
        );
        let ctx = Context::new(&user)
            .with_system(&self.prompts.analyze)
            .with_sampling(0.0, 100);

        let completion = provider.complete(&ctx).await?;
        debug!("analyze_reply raw: {}", completion.text);

        Ok(parse_analysis(&completion.text))
    }

    /// Generate an in-character answer to a reply.
    ///
    /// `None` when the nagger is disabled or returns nothing.
    pub async fn sarcastic_reply(
        &self,
        message: &str,
        tasks: &[Task],
    ) -> Result<Option<SarcasticReply>, TaskbotError> {
        let Some(provider) = &self.nagger else {
            return Ok(None);
        };

        let prompt = self
            .prompts
            .reply_for(provider.name())
            .replace("{tasks}", &numbered_descriptions(tasks))
            .replace("{message}", &clean_input(message));
        let ctx = Context::new(&prompt).with_sampling(0.9, 150);

        let completion = provider.complete(&ctx).await?;
        Ok(parse_sarcastic_reply(&completion.text))
    }

    /// Generate one reminder line. `None` when disabled or empty.
    pub async fn generate_nag(&self) -> Result<Option<String>, TaskbotError> {
        let Some(provider) = &self.nagger else {
            return Ok(None);
        };

        let ctx = Context::new(self.prompts.nag_for(provider.name())).with_sampling(1.0, 100);
        let completion = provider.complete(&ctx).await?;
        let text = completion.text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

/// Neutralize user text before it is quoted inside a prompt.
fn clean_input(message: &str) -> String {
    let result = sanitize(message);
    if result.was_modified {
        warn!("sanitized reply text: {}", result.warnings.join(", "));
    }
    result.text
}

/// The outermost `{...}` span of `text`, if any.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_analysis(text: &str) -> ReplyAnalysis {
    extract_json_object(text)
        .and_then(|json| match serde_json::from_str::<ReplyAnalysis>(json) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("failed to parse reply analysis: {e}: {text}");
                None
            }
        })
        .unwrap_or_else(|| ReplyAnalysis::fallback("parse error"))
}

/// Remove markdown code fences around a JSON answer.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_sarcastic_reply(text: &str) -> Option<SarcasticReply> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let cleaned = strip_code_fences(text);
    match serde_json::from_str::<SarcasticReply>(&cleaned) {
        Ok(mut parsed) => {
            if parsed.reply.trim().is_empty() {
                parsed.reply = text.to_string();
            }
            // Zero is never a valid task number.
            parsed.task_number = parsed.task_number.filter(|n| *n >= 1);
            Some(parsed)
        }
        Err(_) => Some(SarcasticReply {
            reply: text.to_string(),
            task_number: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use taskbot_core::message::{Completion, CompletionMetadata};

    /// Provider returning a canned answer and recording the last prompt.
    struct MockProvider {
        answer: Result<String, String>,
        last: Mutex<Option<Context>>,
    }

    impl MockProvider {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(text.to_string()),
                last: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err("boom".into()),
                last: Mutex::new(None),
            })
        }

        fn last_context(&self) -> Context {
            self.last.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn requires_api_key(&self) -> bool {
            false
        }

        async fn complete(&self, context: &Context) -> Result<Completion, TaskbotError> {
            *self.last.lock().unwrap() = Some(context.clone());
            match &self.answer {
                Ok(text) => Ok(Completion {
                    text: text.clone(),
                    metadata: CompletionMetadata::default(),
                }),
                Err(e) => Err(TaskbotError::Provider(e.clone())),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn tasks() -> Vec<Task> {
        ["Buy milk", "Send report"]
            .iter()
            .enumerate()
            .map(|(i, d)| Task {
                id: i as i64 + 10,
                chat_id: 1,
                description: d.to_string(),
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("Sure! {\"a\": {\"b\": 1}} done"),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_parse_analysis() {
        let a = parse_analysis(
            "```json\n{\"taskNumber\": 2, \"shouldComplete\": true, \"summary\": \"sent\"}\n```",
        );
        assert_eq!(a.completed_task(), Some(2));
        assert_eq!(a.summary, "sent");

        let unclear = parse_analysis(r#"{"taskNumber": null, "shouldComplete": false}"#);
        assert_eq!(unclear.completed_task(), None);

        assert_eq!(parse_analysis("I cannot help").summary, "parse error");
        assert_eq!(parse_analysis("{not json}").summary, "parse error");
    }

    #[test]
    fn test_parse_analysis_tolerates_loose_types() {
        for json in [
            r#"{"taskNumber": 2, "shouldComplete": true, "summary": null}"#,
            r#"{"taskNumber": "2", "shouldComplete": true, "summary": "ok"}"#,
            r#"{"taskNumber": 2.0, "shouldComplete": true}"#,
            r#"{"taskNumber": " 2 ", "shouldComplete": "true"}"#,
            r#"{"taskNumber": 2, "shouldComplete": 1}"#,
        ] {
            let a = parse_analysis(json);
            assert_eq!(a.completed_task(), Some(2), "{json}");
            assert_ne!(a.summary, "parse error", "{json}");
        }

        let null_summary =
            parse_analysis(r#"{"taskNumber": 1, "shouldComplete": true, "summary": null}"#);
        assert_eq!(null_summary.summary, "");

        for json in [
            r#"{"taskNumber": 2.5, "shouldComplete": true}"#,
            r#"{"taskNumber": "two", "shouldComplete": true}"#,
            r#"{"taskNumber": 2, "shouldComplete": "false"}"#,
            r#"{"taskNumber": 2, "shouldComplete": 0}"#,
            r#"{"taskNumber": 2, "shouldComplete": null}"#,
        ] {
            assert_eq!(parse_analysis(json).completed_task(), None, "{json}");
        }
    }

    #[test]
    fn test_completed_task_requires_both_fields() {
        let named_only = ReplyAnalysis {
            task_number: Some(1),
            should_complete: false,
            summary: String::new(),
        };
        assert_eq!(named_only.completed_task(), None);

        let zero = ReplyAnalysis {
            task_number: Some(0),
            should_complete: true,
            summary: String::new(),
        };
        assert_eq!(zero.completed_task(), None);
    }

    #[test]
    fn test_parse_sarcastic_reply() {
        let r = parse_sarcastic_reply(
            "```json\n{\"reply\": \"Finally 💪\", \"taskNumber\": 1}\n```",
        )
        .unwrap();
        assert_eq!(r.reply, "Finally 💪");
        assert_eq!(r.task_number, Some(1));

        let plain = parse_sarcastic_reply("  Just go do it.  ").unwrap();
        assert_eq!(plain.reply, "Just go do it.");
        assert_eq!(plain.task_number, None);

        let empty_reply = parse_sarcastic_reply(r#"{"reply": "", "taskNumber": 0}"#).unwrap();
        assert_eq!(empty_reply.reply, r#"{"reply": "", "taskNumber": 0}"#);
        assert_eq!(empty_reply.task_number, None);

        assert!(parse_sarcastic_reply("   ").is_none());
    }

    #[tokio::test]
    async fn test_disabled_assistant_degrades() {
        let assistant = Assistant::new(None, None, Prompts::default());
        assert!(!assistant.has_analyzer());
        assert!(!assistant.has_nagger());

        let a = assistant.analyze_reply("done", &tasks()).await.unwrap();
        assert_eq!(a.summary, "AI not configured");
        assert_eq!(a.completed_task(), None);
        assert!(assistant.sarcastic_reply("hi", &tasks()).await.unwrap().is_none());
        assert!(assistant.generate_nag().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_analyze_reply_builds_prompt() {
        let mock = MockProvider::answering(
            r#"{"taskNumber": 2, "shouldComplete": true, "summary": "report sent"}"#,
        );
        let assistant = Assistant::new(Some(mock.clone()), None, Prompts::default());

        let a = assistant
            .analyze_reply("sent the \"report\"", &tasks())
            .await
            .unwrap();
        assert_eq!(a.completed_task(), Some(2));

        let ctx = mock.last_context();
        assert_eq!(ctx.temperature, Some(0.0));
        assert_eq!(ctx.max_tokens, Some(100));
        assert!(ctx.system_prompt.contains("taskNumber"));
        assert!(ctx
            .current_message
            .starts_with("Task list:\n1. Buy milk\n2. Send report\n\nUser message: \""));
        // Embedded quotes are neutralized so the prompt's quoting holds.
        assert!(!ctx.current_message.contains("\"report\""));
    }

    #[tokio::test]
    async fn test_sarcastic_reply_fills_template() {
        let mock = MockProvider::answering(r#"{"reply": "Took you long enough", "taskNumber": 1}"#);
        let assistant = Assistant::new(None, Some(mock.clone()), Prompts::default());

        let r = assistant
            .sarcastic_reply("milk bought", &tasks())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(r.reply, "Took you long enough");
        assert_eq!(r.task_number, Some(1));

        let ctx = mock.last_context();
        assert_eq!(ctx.temperature, Some(0.9));
        assert_eq!(ctx.max_tokens, Some(150));
        assert!(ctx.system_prompt.is_empty());
        assert!(ctx.current_message.contains("1. Buy milk\n2. Send report"));
        assert!(ctx.current_message.contains("milk bought"));
        assert!(!ctx.current_message.contains("{tasks}"));
    }

    #[tokio::test]
    async fn test_generate_nag() {
        let mock = MockProvider::answering("  Move it! 🔥\n");
        let assistant = Assistant::new(None, Some(mock.clone()), Prompts::default());
        assert_eq!(
            assistant.generate_nag().await.unwrap().as_deref(),
            Some("Move it! 🔥")
        );
        let ctx = mock.last_context();
        assert_eq!(ctx.temperature, Some(1.0));
        assert_eq!(ctx.max_tokens, Some(100));

        let blank = Assistant::new(None, Some(MockProvider::answering("  ")), Prompts::default());
        assert!(blank.generate_nag().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nag_and_reply_use_provider_persona() {
        let mut prompts = Prompts::default();
        prompts
            .provider_nag
            .insert("mock".into(), "Mock persona nag".into());
        prompts
            .provider_reply
            .insert("mock".into(), "Mock persona: {tasks} / {message}".into());
        let mock = MockProvider::answering("ok");
        let assistant = Assistant::new(None, Some(mock.clone()), prompts);

        assistant.generate_nag().await.unwrap();
        assert_eq!(mock.last_context().current_message, "Mock persona nag");

        assistant.sarcastic_reply("done", &tasks()).await.unwrap();
        assert!(mock
            .last_context()
            .current_message
            .starts_with("Mock persona: 1. Buy milk"));

        // Without an entry the shared prompt is used.
        let shared = MockProvider::answering("ok");
        Assistant::new(None, Some(shared.clone()), Prompts::default())
            .generate_nag()
            .await
            .unwrap();
        assert_eq!(shared.last_context().current_message, Prompts::default().nag);
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let assistant = Assistant::new(
            Some(MockProvider::failing()),
            Some(MockProvider::failing()),
            Prompts::default(),
        );
        assert!(assistant.analyze_reply("done", &tasks()).await.is_err());
        assert!(assistant.generate_nag().await.is_err());
    }

    #[test]
    fn test_from_config_nagger_falls_back_to_openai() {
        let mut cfg = ProviderConfig::default();
        cfg.openai.api_key = "sk-test".into();
        let assistant = Assistant::from_config(&cfg, Prompts::default());
        assert_eq!(assistant.analyzer_name(), Some("openai"));
        assert_eq!(assistant.nagger_name(), Some("openai"));

        let none = Assistant::from_config(&ProviderConfig::default(), Prompts::default());
        assert!(!none.has_analyzer());
        assert!(!none.has_nagger());
    }
}
